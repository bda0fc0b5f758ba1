//! Error types for list view-models.

use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CrudError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to encode request body: {0}")]
    Encode(String),

    #[error("no confirmation is pending")]
    NothingPending,

    #[error("another change is still in progress")]
    Busy,

    #[error("{resource} does not support {operation}")]
    Unsupported {
        resource: &'static str,
        operation: &'static str,
    },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("{resource} does not accept scope '{key}'")]
    InvalidScope { resource: &'static str, key: String },
}

impl CrudError {
    /// Message suitable for a notice.
    pub fn user_message(&self) -> String {
        match self {
            CrudError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub type CrudResult<T> = Result<T, CrudError>;
