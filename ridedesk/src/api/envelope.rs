//! Entity envelope decoding.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::client::ApiClient;
use super::error::ApiError;
use super::request::ApiRequest;

/// The `{success, data, message}` wrapper used by every API response.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Envelope<T = Value> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope<Value> {
    /// Parse an envelope from a raw body.
    pub fn from_body(body: Value) -> Result<Self, ApiError> {
        if !body.is_object() {
            return Err(ApiError::Decode("response is not an envelope object".to_string()));
        }
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Convert a `success: false` envelope into [`ApiError::Rejected`].
    pub fn into_result(self) -> Result<(Option<Value>, Option<String>), ApiError> {
        if self.success {
            Ok((self.data, self.message))
        } else {
            Err(ApiError::Rejected(self.message))
        }
    }
}

/// Fetch a list payload and decode each item independently.
///
/// The `data` field may be a bare array or a paginated object carrying the
/// rows under `data` (or `items`). Items that fail to decode are logged and
/// dropped so one malformed row never hides the rest of the list.
pub async fn fetch_list<T: DeserializeOwned>(
    client: &dyn ApiClient,
    request: ApiRequest,
) -> Result<Vec<T>, ApiError> {
    let path = request.path.clone();
    let body = client.send(request).await?;
    let (data, _) = Envelope::from_body(body)?.into_result()?;

    let rows = match data {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(Value::Object(mut page)) => match page.remove("data").or_else(|| page.remove("items")) {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(ApiError::Decode(format!(
                    "expected a list payload from {}",
                    path
                )))
            }
        },
        Some(_) => {
            return Err(ApiError::Decode(format!(
                "expected a list payload from {}",
                path
            )))
        }
    };

    let total = rows.len();
    let items: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<T>(row) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(path = %path, index, error = %e, "Dropping malformed list item");
                None
            }
        })
        .collect();

    if items.len() < total {
        warn!(
            path = %path,
            kept = items.len(),
            dropped = total - items.len(),
            "List contained malformed items"
        );
    }

    Ok(items)
}

/// Fetch a single entity payload.
pub async fn fetch_one<T: DeserializeOwned>(
    client: &dyn ApiClient,
    request: ApiRequest,
) -> Result<T, ApiError> {
    let body = client.send(request).await?;
    let (data, _) = Envelope::from_body(body)?.into_result()?;
    let data = data.ok_or_else(|| ApiError::Decode("envelope has no data".to_string()))?;
    serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Run a mutation and return the server's message, if any.
pub async fn execute(client: &dyn ApiClient, request: ApiRequest) -> Result<Option<String>, ApiError> {
    let body = client.send(request).await?;
    // Some mutation endpoints reply 204 with no body.
    if body.is_null() {
        return Ok(None);
    }
    let (_, message) = Envelope::from_body(body)?.into_result()?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpMethod, MockApiClient};
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: u64,
        name: String,
    }

    #[tokio::test]
    async fn test_fetch_list_plain_array() {
        let api = MockApiClient::new();
        api.respond_ok(
            HttpMethod::Get,
            "/rows",
            json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]),
        );

        let rows: Vec<Row> = fetch_list(&api, ApiRequest::get("/rows")).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "b");
    }

    #[tokio::test]
    async fn test_fetch_list_paginated() {
        let api = MockApiClient::new();
        api.respond_ok(
            HttpMethod::Get,
            "/rows",
            json!({"current_page": 1, "data": [{"id": 3, "name": "c"}], "total": 1}),
        );

        let rows: Vec<Row> = fetch_list(&api, ApiRequest::get("/rows")).await.unwrap();
        assert_eq!(rows, vec![Row { id: 3, name: "c".to_string() }]);
    }

    #[tokio::test]
    async fn test_fetch_list_drops_malformed_items() {
        let api = MockApiClient::new();
        api.respond_ok(
            HttpMethod::Get,
            "/rows",
            json!([{"id": 1, "name": "ok"}, {"id": "x"}, {"id": 2, "name": "ok too"}]),
        );

        let rows: Vec<Row> = fetch_list(&api, ApiRequest::get("/rows")).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_rejected_envelope() {
        let api = MockApiClient::new();
        api.respond(
            HttpMethod::Get,
            "/rows",
            Ok(json!({"success": false, "message": "Not allowed"})),
        );

        let result: Result<Vec<Row>, _> = fetch_list(&api, ApiRequest::get("/rows")).await;
        assert_eq!(result, Err(ApiError::Rejected(Some("Not allowed".to_string()))));
    }

    #[tokio::test]
    async fn test_non_object_body_is_decode_error() {
        let api = MockApiClient::new();
        api.respond(HttpMethod::Get, "/rows", Ok(json!([1, 2, 3])));

        let result: Result<Vec<Row>, _> = fetch_list(&api, ApiRequest::get("/rows")).await;
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_execute_returns_message() {
        let api = MockApiClient::new();
        api.respond(
            HttpMethod::Delete,
            "/rows/1",
            Ok(json!({"success": true, "message": "Deleted"})),
        );

        let message = execute(&api, ApiRequest::delete("/rows/1")).await.unwrap();
        assert_eq!(message.as_deref(), Some("Deleted"));
    }

    #[tokio::test]
    async fn test_fetch_one() {
        let api = MockApiClient::new();
        api.respond_ok(HttpMethod::Get, "/rows/9", json!({"id": 9, "name": "nine"}));

        let row: Row = fetch_one(&api, ApiRequest::get("/rows/9")).await.unwrap();
        assert_eq!(row.id, 9);
    }
}
