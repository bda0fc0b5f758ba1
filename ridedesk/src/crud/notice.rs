//! Transient user-facing messages ("toasts").

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

/// How many notices a board keeps before dropping the oldest.
pub const DEFAULT_NOTICE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Bounded queue of pending notices.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    pending: VecDeque<Notice>,
    capacity: usize,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NOTICE_CAPACITY)
    }
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, notice: Notice) {
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(notice);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Notice::new(NoticeLevel::Success, message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Notice::new(NoticeLevel::Info, message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Notice::new(NoticeLevel::Warning, message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Notice::new(NoticeLevel::Error, message));
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.pending.back()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain every pending notice, oldest first.
    pub fn take(&mut self) -> Vec<Notice> {
        self.pending.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
