//! Transport abstraction between workflow steps and the remote API.
//!
//! Steps describe requests as data ([`ApiRequest`]); an [`ApiClient`] turns
//! them into responses. The production client ([`http::HttpClient`]) talks
//! real HTTP; the scripted client ([`scripted::ScriptedClient`]) replays
//! canned responses so workflow logic can be tested without a network.

pub mod http;
pub mod scripted;

use async_trait::async_trait;
use serde_json::Value;

// ──────────────────────────────────────────────
// ApiRequest / ApiResponse
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request described by a step. `path` is relative to the client's base
/// URL and may carry a query string. `bearer` is set by every step except
/// login; the client adds tenant and content headers itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::Get,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        ApiRequest {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
            bearer: None,
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        ApiRequest {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
            bearer: None,
        }
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Status and parsed body of a completed exchange. Non-2xx statuses are
/// responses, not transport errors; steps decide what is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        ApiResponse { status, body }
    }

    /// The remote's `message` envelope field, if present.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

// ──────────────────────────────────────────────
// TransportError
// ──────────────────────────────────────────────

/// Failure to complete an exchange at all. Anything that did produce a
/// status code comes back as an [`ApiResponse`] instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request {method} {path} failed: {message}")]
    Network {
        method: Method,
        path: String,
        message: String,
    },

    #[error("response from {path} could not be read: {message}")]
    InvalidBody { path: String, message: String },

    #[error("transport worker failed: {message}")]
    Worker { message: String },
}

// ──────────────────────────────────────────────
// ApiClient trait
// ──────────────────────────────────────────────

/// Sends one [`ApiRequest`] and returns the remote's response.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_builders_set_method_and_body() {
        let get = ApiRequest::get("/api/master/provider?page=0&size=20");
        assert_eq!(get.method, Method::Get);
        assert!(get.body.is_none());
        assert!(get.bearer.is_none());

        let post = ApiRequest::post("/api/master/login", json!({"username": "u"}));
        assert_eq!(post.method, Method::Post);
        assert!(post.body.is_some());
    }

    #[test]
    fn with_bearer_attaches_token() {
        let req = ApiRequest::get("/api/master/patient").with_bearer("tok-1");
        assert_eq!(req.bearer.as_deref(), Some("tok-1"));
    }

    #[test]
    fn response_message_reads_envelope() {
        let res = ApiResponse::new(201, json!({"message": "Provider created successfully."}));
        assert_eq!(res.message(), Some("Provider created successfully."));

        let res = ApiResponse::new(200, json!({"data": []}));
        assert_eq!(res.message(), None);
    }
}
