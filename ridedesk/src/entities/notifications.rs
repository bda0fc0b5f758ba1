//! Push notifications broadcast to riders and drivers.
//!
//! Notifications are write-once: "creating" one sends it, and there is no
//! status to toggle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::wire::{Row, RowError};
use crate::crud::{unknown_filter_key, CrudError, Resource};

/// Recipient group of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAudience {
    #[serde(alias = "user", alias = "rider", alias = "riders")]
    Users,
    #[serde(alias = "driver")]
    Drivers,
    #[serde(other)]
    All,
}

impl NotificationAudience {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationAudience::Users => "Riders",
            NotificationAudience::Drivers => "Drivers",
            NotificationAudience::All => "Everyone",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "users" | "user" | "rider" | "riders" => Some(NotificationAudience::Users),
            "drivers" | "driver" => Some(NotificationAudience::Drivers),
            "all" | "everyone" => Some(NotificationAudience::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub audience: NotificationAudience,
    pub recipients: u64,
    pub sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<Value> for Notification {
    type Error = RowError;

    fn try_from(value: Value) -> Result<Self, RowError> {
        let row = Row::new(&value)?;
        Ok(Self {
            id: row.id(&["id"])?,
            title: row.string_or_empty(&["title", "subject"]),
            content: row.string_or_empty(&["content", "body", "message"]),
            audience: row
                .decode(&["audience", "target", "type"])
                .unwrap_or(NotificationAudience::All),
            recipients: row.count(&["recipients", "recipients_count"]),
            sent_at: row.opt_timestamp(&["sent_at", "created_at"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationDraft {
    pub title: String,
    pub content: String,
    pub audience: NotificationAudience,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFilter {
    pub audience: Option<NotificationAudience>,
}

pub struct Notifications;

impl Resource for Notifications {
    type Entity = Notification;
    type Draft = NotificationDraft;
    type Filter = NotificationFilter;

    const NAME: &'static str = "notification";
    const PATH: &'static str = "/admin/notifications";
    const COLUMNS: &'static [&'static str] = &["ID", "Title", "Audience", "Recipients", "Sent"];
    const HAS_STATUS: bool = false;
    const CREATED_VERB: &'static str = "sent";

    fn id(e: &Notification) -> u64 {
        e.id
    }

    fn label(e: &Notification) -> String {
        e.title.clone()
    }

    fn search_text(e: &Notification) -> String {
        format!("{} {}", e.title, e.content)
    }

    fn matches(e: &Notification, filter: &NotificationFilter) -> bool {
        filter.audience.map_or(true, |wanted| e.audience == wanted)
    }

    fn row(e: &Notification) -> Vec<String> {
        vec![
            e.id.to_string(),
            e.title.clone(),
            e.audience.label().to_string(),
            e.recipients.to_string(),
            e.sent_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]
    }

    fn set_filter_field(
        filter: &mut NotificationFilter,
        key: &str,
        value: &str,
    ) -> Result<(), CrudError> {
        match key {
            "audience" | "target" => {
                if value.trim().is_empty() {
                    filter.audience = None;
                } else {
                    filter.audience = Some(NotificationAudience::parse(value).ok_or_else(|| {
                        CrudError::InvalidFilter(format!(
                            "unknown audience '{}', expected users, drivers or all",
                            value
                        ))
                    })?);
                }
            }
            _ => return Err(unknown_filter_key::<Self>(key)),
        }
        Ok(())
    }
}
