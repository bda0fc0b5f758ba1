//! Scripted API client for tests and offline use.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;

use super::client::{ApiClient, BoxFuture};
use super::error::ApiError;
use super::request::{ApiRequest, HttpMethod};

type RouteKey = (HttpMethod, String);

/// Holds back responses on a route until released.
///
/// Each [`release`](Self::release) lets exactly one pending (or future)
/// request on the route complete.
#[derive(Clone, Debug)]
pub struct ResponseGate {
    notify: Arc<Notify>,
}

impl ResponseGate {
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

/// Mock API client with scripted responses and a call log.
///
/// Responses are queued per `(method, path)`. Each request consumes the front
/// of the queue, except that the last scripted response keeps repeating.
/// Unscripted routes answer with HTTP 404.
#[derive(Default)]
pub struct MockApiClient {
    routes: Mutex<HashMap<RouteKey, VecDeque<Result<Value, ApiError>>>>,
    gates: Mutex<HashMap<RouteKey, ResponseGate>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw body (or error) for a route.
    pub fn respond(&self, method: HttpMethod, path: &str, response: Result<Value, ApiError>) {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Queue a successful envelope wrapping `data`.
    pub fn respond_ok(&self, method: HttpMethod, path: &str, data: Value) {
        self.respond(method, path, Ok(json!({"success": true, "data": data})));
    }

    /// Queue a successful envelope with a message and no data.
    pub fn respond_message(&self, method: HttpMethod, path: &str, message: &str) {
        self.respond(method, path, Ok(json!({"success": true, "message": message})));
    }

    /// Make requests on a route wait until the returned gate is released.
    pub fn hold(&self, method: HttpMethod, path: &str) -> ResponseGate {
        let gate = ResponseGate {
            notify: Arc::new(Notify::new()),
        };
        self.gates
            .lock()
            .insert((method, path.to_string()), gate.clone());
        gate
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().clone()
    }

    /// Number of requests received on a route.
    pub fn call_count(&self, method: HttpMethod, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    /// Total number of requests received.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_response(&self, key: &RouteKey) -> Result<Value, ApiError> {
        let mut routes = self.routes.lock();
        match routes.get_mut(key) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(not_found(&key.1))),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Err(not_found(&key.1))),
            None => Err(not_found(&key.1)),
        }
    }
}

fn not_found(path: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        path: path.to_string(),
        message: None,
    }
}

impl ApiClient for MockApiClient {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>> {
        Box::pin(async move {
            let key = (request.method, request.path.clone());
            self.calls.lock().push(request);

            let gate = self.gates.lock().get(&key).cloned();
            if let Some(gate) = gate {
                gate.notify.notified().await;
            }

            self.next_response(&key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_response_repeats() {
        let api = MockApiClient::new();
        api.respond(HttpMethod::Get, "/a", Ok(json!(1)));
        api.respond(HttpMethod::Get, "/a", Ok(json!(2)));

        assert_eq!(api.send(ApiRequest::get("/a")).await, Ok(json!(1)));
        assert_eq!(api.send(ApiRequest::get("/a")).await, Ok(json!(2)));
        assert_eq!(api.send(ApiRequest::get("/a")).await, Ok(json!(2)));
        assert_eq!(api.call_count(HttpMethod::Get, "/a"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_route_is_404() {
        let api = MockApiClient::new();
        let result = api.send(ApiRequest::get("/nowhere")).await;
        assert!(matches!(result, Err(ApiError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_gate_holds_response() {
        let api = Arc::new(MockApiClient::new());
        api.respond_ok(HttpMethod::Get, "/slow", json!([]));
        let gate = api.hold(HttpMethod::Get, "/slow");

        let api_clone = Arc::clone(&api);
        let handle = tokio::spawn(async move { api_clone.send(ApiRequest::get("/slow")).await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        gate.release();
        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }
}
