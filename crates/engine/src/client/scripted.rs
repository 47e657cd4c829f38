//! Scripted client for workflow tests.
//!
//! Holds an ordered queue of expected exchanges. Each `send` consumes the
//! front entry after checking that the request matches its method and path
//! prefix; a mismatch fails loudly so a reordered workflow cannot pass by
//! accident. All requests are logged for later assertions.

use super::{ApiClient, ApiRequest, ApiResponse, Method, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Reply {
    Respond(ApiResponse),
    Fail(String),
}

struct Expectation {
    method: Method,
    path_prefix: String,
    reply: Reply,
}

/// Replays a fixed script of responses in order.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Expectation>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        ScriptedClient::default()
    }

    /// Queue a response for the next request matching `method` and a path
    /// starting with `path_prefix`.
    pub fn respond(&self, method: Method, path_prefix: &str, status: u16, body: Value) {
        self.push(Expectation {
            method,
            path_prefix: path_prefix.to_string(),
            reply: Reply::Respond(ApiResponse::new(status, body)),
        });
    }

    /// Queue a transport failure for the next matching request.
    pub fn fail(&self, method: Method, path_prefix: &str, message: &str) {
        self.push(Expectation {
            method,
            path_prefix: path_prefix.to_string(),
            reply: Reply::Fail(message.to_string()),
        });
    }

    fn push(&self, expectation: Expectation) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(expectation);
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of scripted entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ApiClient for ScriptedClient {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        let Some(expectation) = next else {
            return Err(TransportError::Network {
                method: request.method,
                path: request.path.clone(),
                message: "scripted client exhausted".to_string(),
            });
        };

        if expectation.method != request.method
            || !request.path.starts_with(&expectation.path_prefix)
        {
            return Err(TransportError::Network {
                method: request.method,
                path: request.path.clone(),
                message: format!(
                    "unexpected request; script expected {} {}",
                    expectation.method, expectation.path_prefix
                ),
            });
        }

        match expectation.reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(message) => Err(TransportError::Network {
                method: request.method,
                path: request.path.clone(),
                message,
            }),
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replies_in_order_and_logs_requests() {
        let client = ScriptedClient::new();
        client.respond(Method::Post, "/api/master/login", 200, json!({"ok": 1}));
        client.respond(Method::Get, "/api/master/provider", 200, json!({"ok": 2}));

        let first = client
            .send(&ApiRequest::post("/api/master/login", json!({})))
            .await
            .unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(first.body, json!({"ok": 1}));

        let second = client
            .send(&ApiRequest::get("/api/master/provider?page=0&size=20"))
            .await
            .unwrap();
        assert_eq!(second.body, json!({"ok": 2}));

        assert_eq!(client.requests().len(), 2);
        assert_eq!(client.remaining(), 0);
    }

    #[tokio::test]
    async fn mismatched_request_is_an_error() {
        let client = ScriptedClient::new();
        client.respond(Method::Post, "/api/master/login", 200, json!({}));

        let err = client
            .send(&ApiRequest::get("/api/master/patient"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network { .. }));
    }

    #[tokio::test]
    async fn exhausted_script_is_an_error() {
        let client = ScriptedClient::new();
        let err = client
            .send(&ApiRequest::get("/api/master/patient"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }

    #[tokio::test]
    async fn scripted_failure_propagates() {
        let client = ScriptedClient::new();
        client.fail(Method::Post, "/api/master/provider", "connection reset");

        let err = client
            .send(&ApiRequest::post("/api/master/provider", json!({})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
