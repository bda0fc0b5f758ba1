//! Error types for backend API access.

use thiserror::Error;

/// Message shown to the user when the server gave no usable explanation.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the backend.
///
/// Every variant is recoverable: view-models surface it as a notice and keep
/// their last-known-good state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Transport failure (DNS, connect, timeout, TLS).
    #[error("Request failed: {0}")]
    Network(String),

    /// Non-2xx HTTP status.
    #[error("HTTP {status} from {path}")]
    Status {
        status: u16,
        path: String,
        /// Server-provided message from the error body, if any.
        message: Option<String>,
    },

    /// The envelope reported `success: false`.
    #[error("Request rejected: {}", .0.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE))]
    Rejected(Option<String>),

    /// The body was not a valid envelope or the payload had the wrong shape.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The configured base URL or request path could not form a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// The text to show in a toast for this error.
    ///
    /// Prefers the server-provided message and falls back to
    /// [`GENERIC_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            ApiError::Rejected(Some(message)) if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ApiError::Rejected(Some("Name already taken".to_string()));
        assert_eq!(err.user_message(), "Name already taken");

        let err = ApiError::Status {
            status: 422,
            path: "/admin/sos-contacts".to_string(),
            message: Some("Phone is invalid".to_string()),
        };
        assert_eq!(err.user_message(), "Phone is invalid");
    }

    #[test]
    fn test_user_message_falls_back_to_generic() {
        assert_eq!(
            ApiError::Network("connection refused".to_string()).user_message(),
            GENERIC_ERROR_MESSAGE
        );
        assert_eq!(
            ApiError::Rejected(Some("   ".to_string())).user_message(),
            GENERIC_ERROR_MESSAGE
        );
        assert_eq!(ApiError::Rejected(None).user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_display_includes_status() {
        let err = ApiError::Status {
            status: 500,
            path: "/admin/wallets".to_string(),
            message: None,
        };
        assert_eq!(err.to_string(), "HTTP 500 from /admin/wallets");
    }
}
