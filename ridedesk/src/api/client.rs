//! HTTP client abstraction for testability.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::error::ApiError;
use super::request::{ApiRequest, HttpMethod};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for backend API calls.
///
/// Implementations perform the HTTP exchange and return the parsed JSON body
/// for 2xx responses. Envelope interpretation is layered on top by
/// [`fetch_list`](super::fetch_list) and friends, which keeps this trait small
/// enough to mock.
pub trait ApiClient: Send + Sync {
    /// Send a request and return the JSON body.
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>>;
}

/// Connection settings for [`ReqwestApiClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base URL including any `/api` prefix, e.g. `https://ops.example.com/api`.
    pub base_url: String,
    /// Bearer token attached to every request.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join the base URL and a request path.
    pub fn url_for(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        reqwest::Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", joined, e)))
    }
}

/// Real API client implementation using reqwest.
pub struct ReqwestApiClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl ReqwestApiClient {
    /// Creates a client for the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        // Fail fast on a malformed base URL rather than on the first request.
        config.url_for("/")?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn send_inner(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.config.url_for(&request.path)?;
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, path = %request.path, "API request");

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            // Error bodies usually still carry an envelope with a message.
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(String::from));
            warn!(
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                "API request failed"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                path: request.path,
                message,
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl ApiClient for ReqwestApiClient {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>> {
        Box::pin(self.send_inner(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_without_double_slash() {
        let config = ApiConfig::new("https://ops.example.com/api/");
        let url = config.url_for("/admin/wallets").unwrap();
        assert_eq!(url.as_str(), "https://ops.example.com/api/admin/wallets");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = ReqwestApiClient::new(ApiConfig::new("not a url"));
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = ApiConfig::new("http://localhost:8000/api")
            .with_token("secret")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
