//! HTTP client for the scheduling API.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. Non-2xx statuses are surfaced as responses
//! so steps can classify them; only socket-level failures become
//! [`TransportError`]s.

use super::{ApiClient, ApiRequest, ApiResponse, Method, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Client bound to one base URL and tenant.
///
/// Every request carries `Accept`, `Content-Type` and `X-TENANT-ID`; a
/// bearer header is added when the request has a token.
pub struct HttpClient {
    base_url: String,
    tenant: String,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, tenant: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into();
        HttpClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            tenant: tenant.into(),
            timeout,
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path);
        let method = request.method;
        let path = request.path.clone();
        let tenant = self.tenant.clone();
        let bearer = request.bearer.clone();
        let body = request.body.clone();
        let timeout = self.timeout;

        tracing::debug!(%method, %path, "sending request");

        let result = tokio::task::spawn_blocking(move || {
            let config = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .http_status_as_error(false)
                .build();
            let agent = ureq::Agent::new_with_config(config);

            let auth = bearer.map(|token| format!("Bearer {}", token));

            // GET builders and bodied builders are distinct types in ureq,
            // so the two shapes are assembled separately.
            let sent = match method {
                Method::Get => {
                    let mut builder = agent
                        .get(&url)
                        .header("Accept", "application/json, text/plain, */*")
                        .header("Content-Type", "application/json")
                        .header("X-TENANT-ID", &tenant);
                    if let Some(ref auth) = auth {
                        builder = builder.header("Authorization", auth);
                    }
                    builder.call()
                }
                Method::Post | Method::Put => {
                    let mut builder = if method == Method::Post {
                        agent.post(&url)
                    } else {
                        agent.put(&url)
                    }
                    .header("Accept", "application/json, text/plain, */*")
                    .header("Content-Type", "application/json")
                    .header("X-TENANT-ID", &tenant);
                    if let Some(ref auth) = auth {
                        builder = builder.header("Authorization", auth);
                    }
                    match body {
                        Some(json) => builder.send_json(&json),
                        None => builder.send_empty(),
                    }
                }
            };

            let response = sent.map_err(|e| TransportError::Network {
                method,
                path: path.clone(),
                message: e.to_string(),
            })?;

            let status = response.status().as_u16();
            let text = response
                .into_body()
                .read_to_string()
                .map_err(|e| TransportError::InvalidBody {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

            // Some endpoints answer errors with empty or non-JSON bodies;
            // keep the raw text so the step can still report it.
            let parsed = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| Value::String(text));

            Ok(ApiResponse::new(status, parsed))
        })
        .await
        .map_err(|e| TransportError::Worker {
            message: e.to_string(),
        })?;

        if let Ok(ref response) = result {
            tracing::debug!(%method, path = %request.path, status = response.status, "response received");
        }
        result
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joining_normalizes_slashes() {
        let client = HttpClient::new(
            "https://stage-api.example.com/",
            "stage_tenant",
            Duration::from_secs(30),
        );
        assert_eq!(
            client.url_for("/api/master/login"),
            "https://stage-api.example.com/api/master/login"
        );
        assert_eq!(
            client.url_for("api/master/provider?page=0&size=20"),
            "https://stage-api.example.com/api/master/provider?page=0&size=20"
        );
    }
}
