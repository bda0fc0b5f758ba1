//! Backend REST API access.
//!
//! Every backend response is wrapped in an entity envelope:
//!
//! ```text
//! { "success": true, "data": ..., "message": "optional" }
//! ```
//!
//! The [`ApiClient`] trait performs raw requests and returns the decoded JSON
//! body. The free functions in this module ([`fetch_list`], [`fetch_one`],
//! [`execute`]) unwrap the envelope and decode typed payloads on top of any
//! client, so view-models only depend on `Arc<dyn ApiClient>`.
//!
//! # Example
//!
//! ```ignore
//! use ridedesk::api::{fetch_list, ApiConfig, ApiRequest, ReqwestApiClient};
//!
//! let client = ReqwestApiClient::new(ApiConfig::new("https://ops.example.com/api"))?;
//! let reasons: Vec<Value> = fetch_list(&client, ApiRequest::get("/admin/cancellation-reasons")).await?;
//! ```

mod client;
mod envelope;
mod error;
mod mock;
mod request;
pub mod wire;

pub use client::{ApiClient, ApiConfig, BoxFuture, ReqwestApiClient, DEFAULT_TIMEOUT_SECS};
pub use envelope::{execute, fetch_list, fetch_one, Envelope};
pub use error::{ApiError, ApiResult, GENERIC_ERROR_MESSAGE};
pub use mock::{MockApiClient, ResponseGate};
pub use request::{ApiRequest, HttpMethod};
