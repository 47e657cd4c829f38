//! The single-request step contract.
//!
//! A step declares what state it reads and writes, builds one request,
//! classifies the status, checks the body, and extracts values into the
//! run state. Multi-request operations (paginated lookup, booking retry)
//! live in their own modules and compose with the same result vocabulary.

use carewalk_core::{StateError, StateField, WorkflowState};
use serde_json::Value;

use crate::client::{ApiRequest, ApiResponse};

/// Failure while pulling values out of a response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The body lacked expected data. Recorded as an assertion failure.
    #[error("{0}")]
    Missing(String),

    /// The run state rejected a binding. Recorded as a hard error.
    #[error(transparent)]
    State(#[from] StateError),
}

/// One named, single-request workflow step.
pub trait ApiStep: Send + Sync {
    /// Display name used in step results, e.g. `"Add Provider"`.
    fn name(&self) -> &str;

    /// State fields this step reads in [`ApiStep::request`].
    fn requires(&self) -> &[StateField] {
        &[]
    }

    /// State fields this step binds on success.
    fn produces(&self) -> &[StateField] {
        &[]
    }

    /// Build the request from run state. Fails if a required field is
    /// unbound, which the executor records as a precondition error.
    fn request(&self, state: &WorkflowState) -> Result<ApiRequest, StateError>;

    /// Whether this status counts as a passing exchange.
    fn acceptable(&self, status: u16) -> bool;

    /// Check the response body against this step's expectation. `Err`
    /// carries the mismatch detail and marks the step failed.
    fn validate(&self, response: &ApiResponse) -> Result<(), String> {
        let _ = response;
        Ok(())
    }

    /// Pull produced values out of an accepted response into run state.
    fn extract(
        &self,
        response: &ApiResponse,
        state: &mut WorkflowState,
    ) -> Result<(), ExtractError> {
        let _ = (response, state);
        Ok(())
    }
}

/// Shared helper: the remote wraps payloads as `{"data": ...}`.
pub(crate) fn data_of(body: &Value) -> Option<&Value> {
    body.get("data")
}

/// Shared helper: entity lists come back as `{"data": {"content": [...]}}`.
pub(crate) fn content_of(body: &Value) -> Option<&[Value]> {
    data_of(body)?.get("content")?.as_array().map(Vec::as_slice)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_of_walks_the_envelope() {
        let body = json!({"data": {"content": [{"uuid": "p-1"}]}});
        let content = content_of(&body).unwrap();
        assert_eq!(content.len(), 1);

        assert!(content_of(&json!({"data": {}})).is_none());
        assert!(content_of(&json!({})).is_none());
    }
}
