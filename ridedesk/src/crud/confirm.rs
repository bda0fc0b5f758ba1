//! Pending delete confirmations.

use crate::api::ApiRequest;

/// What a confirmation would delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmTarget {
    Single(u64),
    Bulk(Vec<u64>),
}

impl ConfirmTarget {
    pub fn ids(&self) -> Vec<u64> {
        match self {
            ConfirmTarget::Single(id) => vec![*id],
            ConfirmTarget::Bulk(ids) => ids.clone(),
        }
    }
}

/// A destructive action waiting for the user to confirm.
///
/// Holds the prepared request; nothing is sent until
/// [`ListView::confirm`](super::ListView::confirm).
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    pub target: ConfirmTarget,
    pub prompt: String,
    pub(crate) commit: ApiRequest,
}

impl PendingConfirmation {
    pub fn new(target: ConfirmTarget, prompt: impl Into<String>, commit: ApiRequest) -> Self {
        Self {
            target,
            prompt: prompt.into(),
            commit,
        }
    }

    /// The request confirming will send.
    pub fn commit(&self) -> &ApiRequest {
        &self.commit
    }
}
