//! Booking retry and fallback substitution.
//!
//! Two recovery strategies keep a run producing signal after a setback:
//! booking walks an ordered ladder of slot candidates when the calendar
//! rejects a time, and entity creation falls back to adopting an existing
//! remote entity when the create endpoint rejects a fresh one.

use std::time::Duration;

use carewalk_core::{
    Reporter, SlotCandidate, StateField, StepOutcome, StepResult, WorkflowState,
};
use serde_json::Value;

use crate::client::{ApiClient, ApiRequest};
use crate::executor::execute_api_step;
use crate::step::{content_of, ApiStep};

// ──────────────────────────────────────────────
// RetryPolicy
// ──────────────────────────────────────────────

/// Knobs for the booking retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Upper bound on booking attempts, regardless of candidate count.
    pub max_attempts: usize,
    /// Pause between attempts, letting a transiently busy calendar settle.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 8,
            backoff: Duration::from_secs(2),
        }
    }
}

const CONFLICT_MARKERS: &[&str] = &["conflict", "not available", "already booked", "overlap"];

/// Whether a failed booking result signals a slot collision (retry with
/// the next candidate) rather than a structural rejection (stop).
pub fn is_conflict(result: &StepResult) -> bool {
    if result.http_status == Some(409) {
        return true;
    }
    let detail = result.detail.to_lowercase();
    CONFLICT_MARKERS.iter().any(|marker| detail.contains(marker))
}

// ──────────────────────────────────────────────
// Booking retry loop
// ──────────────────────────────────────────────

/// Try booking each slot candidate in order until one is accepted.
///
/// Each attempt appends its own [`StepResult`]. A conflict moves on to the
/// next candidate after the backoff pause; any other failure stops the
/// loop. When every candidate conflicts, one terminal failure summarizing
/// the exhaustion is appended on top of the per-attempt results.
pub async fn book_with_retry<F>(
    client: &dyn ApiClient,
    state: &mut WorkflowState,
    reporter: &mut Reporter,
    candidates: &[SlotCandidate],
    policy: &RetryPolicy,
    build: F,
) -> StepOutcome
where
    F: Fn(&SlotCandidate) -> Box<dyn ApiStep>,
{
    let attempts = candidates.len().min(policy.max_attempts);
    if attempts == 0 {
        reporter.record(StepResult::fail(
            "Book Appointment",
            None,
            "no slot candidates to try",
        ));
        return StepOutcome::Fail;
    }

    let mut last_detail = String::new();
    let mut last_status = None;

    for (attempt, slot) in candidates.iter().take(attempts).enumerate() {
        let step = build(slot);
        let outcome = execute_api_step(client, step.as_ref(), state, reporter).await;

        match outcome {
            StepOutcome::Pass => {
                tracing::info!(attempt = attempt + 1, "booking accepted");
                return StepOutcome::Pass;
            }
            StepOutcome::Error => return StepOutcome::Error,
            StepOutcome::Fail => {
                // Reporter holds this attempt's result as its latest entry.
                let Some(result) = reporter.results().last() else {
                    return StepOutcome::Fail;
                };
                if !is_conflict(result) {
                    return StepOutcome::Fail;
                }
                last_detail = result.detail.clone();
                last_status = result.http_status;
                tracing::info!(
                    attempt = attempt + 1,
                    of = attempts,
                    detail = %last_detail,
                    "slot conflict, trying next candidate"
                );
                if attempt + 1 < attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }

    reporter.record(StepResult::fail(
        "Book Appointment",
        last_status,
        format!(
            "all {} slot candidates rejected; last: {}",
            attempts, last_detail
        ),
    ));
    StepOutcome::Fail
}

// ──────────────────────────────────────────────
// Fallback substitution
// ──────────────────────────────────────────────

/// Adoption of an existing remote entity after a failed creation.
#[derive(Debug, Clone)]
pub struct FallbackSpec {
    /// Display name used in step results, e.g. `"Use Existing Provider"`.
    pub name: String,
    /// Listing path without query, e.g. `"/api/master/provider"`.
    pub list_path: String,
    /// Extra query fragment appended after page/size.
    pub extra_query: String,
    /// Field to bind the adopted entity's UUID into.
    pub id_field: StateField,
    /// Field to bind the adopted entity's identity into, so downstream
    /// lookups target the adopted entity rather than the rejected one.
    pub identity_field: StateField,
}

/// Listing rows may omit the email; lookups still need a value.
const ADOPTED_EMAIL_PLACEHOLDER: &str = "no-email@example.com";

/// Adopt the first entity in the remote listing in place of a fresh
/// creation. Marks its result as a fallback so the report shows the run
/// as degraded.
pub async fn adopt_existing(
    client: &dyn ApiClient,
    spec: &FallbackSpec,
    state: &mut WorkflowState,
    reporter: &mut Reporter,
) -> StepOutcome {
    let token = match state.access_token() {
        Ok(token) => token.to_string(),
        Err(err) => {
            reporter.record(StepResult::error(
                &spec.name,
                format!("precondition: {}", err),
            ));
            return StepOutcome::Error;
        }
    };

    let path = format!("{}?page=0&size=20{}", spec.list_path, spec.extra_query);
    let response = match client.send(&ApiRequest::get(path).with_bearer(token)).await {
        Ok(response) => response,
        Err(err) => {
            reporter.record(StepResult::error(&spec.name, err.to_string()));
            return StepOutcome::Error;
        }
    };

    if response.status != 200 {
        reporter.record(StepResult::fail(
            &spec.name,
            Some(response.status),
            format!("listing returned status {}", response.status),
        ));
        return StepOutcome::Fail;
    }

    let adopted = content_of(&response.body).and_then(|rows| rows.first());
    let Some(row) = adopted else {
        reporter.record(StepResult::fail(
            &spec.name,
            Some(response.status),
            "no existing entity available to adopt",
        ));
        return StepOutcome::Fail;
    };

    let field = |key: &str| row.get(key).and_then(Value::as_str);
    let Some(uuid) = field("uuid") else {
        reporter.record(StepResult::fail(
            &spec.name,
            Some(response.status),
            "adoptable row carried no uuid",
        ));
        return StepOutcome::Fail;
    };

    let identity = carewalk_core::GeneratedIdentity {
        first_name: field("firstName").unwrap_or_default().to_string(),
        last_name: field("lastName").unwrap_or_default().to_string(),
        email: field("email")
            .unwrap_or(ADOPTED_EMAIL_PLACEHOLDER)
            .to_string(),
        phone: None,
    };

    let bound = state
        .set_identity(spec.identity_field, identity.clone())
        .and_then(|_| state.set_text(spec.id_field, uuid));
    if let Err(err) = bound {
        reporter.record(StepResult::error(&spec.name, err.to_string()));
        return StepOutcome::Error;
    }

    tracing::warn!(
        step = %spec.name,
        uuid,
        "creation failed; adopted an existing entity (degraded run)"
    );
    reporter.record(
        StepResult::pass(
            &spec.name,
            response.status,
            format!(
                "adopted existing {} {} -> {}",
                identity.first_name, identity.last_name, uuid
            ),
        )
        .with_fallback(),
    );
    StepOutcome::Pass
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::scripted::ScriptedClient;
    use crate::client::{ApiResponse, Method};
    use carewalk_core::StateError;
    use serde_json::json;
    use time::macros::datetime;

    struct SlotStep {
        start: time::OffsetDateTime,
    }

    impl ApiStep for SlotStep {
        fn name(&self) -> &str {
            "Book Appointment"
        }

        fn request(&self, _state: &WorkflowState) -> Result<ApiRequest, StateError> {
            Ok(ApiRequest::post(
                "/api/master/appointment",
                json!({"startTime": self.start.to_string()}),
            ))
        }

        fn acceptable(&self, status: u16) -> bool {
            status == 200 || status == 201
        }

        fn validate(&self, response: &ApiResponse) -> Result<(), String> {
            match response.message() {
                Some(msg) if msg.contains("booked successfully") => Ok(()),
                Some(msg) => Err(msg.to_string()),
                None => Err("no message".to_string()),
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 8,
            backoff: Duration::from_millis(0),
        }
    }

    fn slots(n: usize) -> Vec<SlotCandidate> {
        carewalk_core::slot_candidates(
            n,
            datetime!(2025-03-03 08:00 UTC),
            3,
            time::Duration::minutes(30),
            true,
        )
    }

    fn build(slot: &SlotCandidate) -> Box<dyn ApiStep> {
        Box::new(SlotStep { start: slot.start })
    }

    #[tokio::test]
    async fn first_acceptance_stops_the_loop() {
        let client = ScriptedClient::new();
        client.respond(
            Method::Post,
            "/api/master/appointment",
            409,
            json!({"message": "slot not available"}),
        );
        client.respond(
            Method::Post,
            "/api/master/appointment",
            409,
            json!({"message": "slot not available"}),
        );
        client.respond(
            Method::Post,
            "/api/master/appointment",
            200,
            json!({"message": "Appointment booked successfully."}),
        );

        let mut state = WorkflowState::new();
        let mut reporter = Reporter::new();
        let outcome = book_with_retry(
            &client,
            &mut state,
            &mut reporter,
            &slots(8),
            &fast_policy(),
            build,
        )
        .await;

        assert_eq!(outcome, StepOutcome::Pass);
        // Two conflict failures, then one pass; no terminal summary.
        assert_eq!(reporter.results().len(), 3);
        assert_eq!(reporter.results()[2].outcome, StepOutcome::Pass);
        assert_eq!(client.requests().len(), 3);
    }

    #[tokio::test]
    async fn exhaustion_appends_a_terminal_failure() {
        let client = ScriptedClient::new();
        for _ in 0..3 {
            client.respond(
                Method::Post,
                "/api/master/appointment",
                409,
                json!({"message": "slot not available"}),
            );
        }

        let mut state = WorkflowState::new();
        let mut reporter = Reporter::new();
        let outcome = book_with_retry(
            &client,
            &mut state,
            &mut reporter,
            &slots(3),
            &fast_policy(),
            build,
        )
        .await;

        assert_eq!(outcome, StepOutcome::Fail);
        // Three attempt failures plus the terminal summary.
        assert_eq!(reporter.results().len(), 4);
        let terminal = reporter.results().last().unwrap();
        assert!(terminal.detail.contains("all 3 slot candidates"));
    }

    #[tokio::test]
    async fn non_conflict_failure_stops_immediately() {
        let client = ScriptedClient::new();
        client.respond(
            Method::Post,
            "/api/master/appointment",
            422,
            json!({"message": "provider has no availability configured"}),
        );

        let mut state = WorkflowState::new();
        let mut reporter = Reporter::new();
        let outcome = book_with_retry(
            &client,
            &mut state,
            &mut reporter,
            &slots(8),
            &fast_policy(),
            build,
        )
        .await;

        assert_eq!(outcome, StepOutcome::Fail);
        assert_eq!(reporter.results().len(), 1);
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn attempt_budget_caps_candidates() {
        let client = ScriptedClient::new();
        for _ in 0..2 {
            client.respond(
                Method::Post,
                "/api/master/appointment",
                409,
                json!({"message": "conflict"}),
            );
        }

        let policy = RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(0),
        };
        let mut state = WorkflowState::new();
        let mut reporter = Reporter::new();
        let outcome =
            book_with_retry(&client, &mut state, &mut reporter, &slots(8), &policy, build).await;

        assert_eq!(outcome, StepOutcome::Fail);
        assert_eq!(client.requests().len(), 2);
    }

    #[test]
    fn conflict_classification() {
        let conflict = StepResult::fail("Book Appointment", Some(200), "Slot NOT Available");
        assert!(is_conflict(&conflict));

        let by_status = StepResult::fail("Book Appointment", Some(409), "rejected");
        assert!(is_conflict(&by_status));

        let structural = StepResult::fail("Book Appointment", Some(422), "bad payload");
        assert!(!is_conflict(&structural));
    }

    fn provider_fallback() -> FallbackSpec {
        FallbackSpec {
            name: "Use Existing Provider".to_string(),
            list_path: "/api/master/provider".to_string(),
            extra_query: String::new(),
            id_field: StateField::ProviderId,
            identity_field: StateField::ProviderIdentity,
        }
    }

    #[tokio::test]
    async fn adoption_binds_id_and_identity_and_degrades_the_run() {
        let client = ScriptedClient::new();
        client.respond(
            Method::Get,
            "/api/master/provider",
            200,
            json!({"data": {"content": [
                {"firstName": "Existing", "lastName": "Doc", "email": "e@example.com", "uuid": "uuid-adopt"}
            ]}}),
        );

        let mut state = WorkflowState::new();
        state.set_text(StateField::AccessToken, "tok-1").unwrap();
        let mut reporter = Reporter::new();
        let outcome = adopt_existing(&client, &provider_fallback(), &mut state, &mut reporter).await;

        assert_eq!(outcome, StepOutcome::Pass);
        assert_eq!(state.provider_id().unwrap(), "uuid-adopt");
        assert_eq!(state.provider_identity().unwrap().first_name, "Existing");
        assert!(reporter.results()[0].fallback);
        assert!(reporter.summary().unwrap().degraded);
    }

    #[tokio::test]
    async fn empty_listing_leaves_nothing_to_adopt() {
        let client = ScriptedClient::new();
        client.respond(
            Method::Get,
            "/api/master/provider",
            200,
            json!({"data": {"content": []}}),
        );

        let mut state = WorkflowState::new();
        state.set_text(StateField::AccessToken, "tok-1").unwrap();
        let mut reporter = Reporter::new();
        let outcome = adopt_existing(&client, &provider_fallback(), &mut state, &mut reporter).await;

        assert_eq!(outcome, StepOutcome::Fail);
        assert!(!state.is_bound(StateField::ProviderId));
    }

    #[tokio::test]
    async fn adopted_row_without_email_gets_a_placeholder() {
        let client = ScriptedClient::new();
        client.respond(
            Method::Get,
            "/api/master/provider",
            200,
            json!({"data": {"content": [
                {"firstName": "Existing", "lastName": "Doc", "email": null, "uuid": "uuid-1"}
            ]}}),
        );

        let mut state = WorkflowState::new();
        state.set_text(StateField::AccessToken, "tok-1").unwrap();
        let mut reporter = Reporter::new();
        adopt_existing(&client, &provider_fallback(), &mut state, &mut reporter).await;

        assert_eq!(
            state.provider_identity().unwrap().email,
            ADOPTED_EMAIL_PLACEHOLDER
        );
    }
}
