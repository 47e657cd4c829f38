//! Runs one [`ApiStep`] end to end and records the result.

use carewalk_core::{Reporter, StepOutcome, StepResult, WorkflowState};

use crate::client::ApiClient;
use crate::step::{ApiStep, ExtractError};

/// Execute a single step: build the request, send it, classify the
/// response, and append exactly one [`StepResult`] to the reporter.
///
/// - an unbound required field or a transport failure records `ERROR`
/// - an unacceptable status or a body mismatch records `FAIL`
/// - everything else records `PASS` and binds the step's produced fields
pub async fn execute_api_step(
    client: &dyn ApiClient,
    step: &dyn ApiStep,
    state: &mut WorkflowState,
    reporter: &mut Reporter,
) -> StepOutcome {
    let request = match step.request(state) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(step = step.name(), %err, "precondition not met");
            reporter.record(StepResult::error(
                step.name(),
                format!("precondition: {}", err),
            ));
            return StepOutcome::Error;
        }
    };

    let response = match client.send(&request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(step = step.name(), %err, "transport failure");
            reporter.record(StepResult::error(step.name(), err.to_string()));
            return StepOutcome::Error;
        }
    };

    if !step.acceptable(response.status) {
        let detail = format!(
            "unexpected status {}: {}",
            response.status,
            response
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| snippet(&response.body))
        );
        tracing::info!(step = step.name(), status = response.status, "step failed");
        reporter.record(StepResult::fail(step.name(), Some(response.status), detail));
        return StepOutcome::Fail;
    }

    if let Err(detail) = step.validate(&response) {
        tracing::info!(step = step.name(), status = response.status, %detail, "body mismatch");
        reporter.record(StepResult::fail(step.name(), Some(response.status), detail));
        return StepOutcome::Fail;
    }

    if let Err(err) = step.extract(&response, state) {
        return match err {
            ExtractError::Missing(detail) => {
                reporter.record(StepResult::fail(step.name(), Some(response.status), detail));
                StepOutcome::Fail
            }
            ExtractError::State(err) => {
                tracing::warn!(step = step.name(), %err, "state binding rejected");
                reporter.record(StepResult::error(step.name(), err.to_string()));
                StepOutcome::Error
            }
        };
    }

    let detail = response
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("status {}", response.status));
    tracing::info!(step = step.name(), status = response.status, "step passed");
    reporter.record(StepResult::pass(step.name(), response.status, detail));
    StepOutcome::Pass
}

/// Bounded rendering of a body for failure details. Bodies can be huge
/// entity lists, so only the head survives into the result.
fn snippet(body: &serde_json::Value) -> String {
    let text = body.to_string();
    if text.chars().count() > 120 {
        text.chars().take(120).collect()
    } else {
        text
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
