//! Create-then-resolve: finding a just-created entity's ID by identity.
//!
//! The remote's creation endpoints return a message but no ID, so the only
//! way to learn the new entity's UUID is to scan the paginated listing for
//! a row whose identity fields match what was submitted. The scan is
//! bounded; a created entity that never shows up within the page budget is
//! a listing defect worth reporting, not a reason to hang.

use carewalk_core::{GeneratedIdentity, Reporter, StepOutcome, StepResult, StateField, WorkflowState};
use serde_json::Value;

use crate::client::{ApiClient, ApiRequest};
use crate::step::content_of;

/// One identity-resolution pass over a paginated entity listing.
#[derive(Debug, Clone)]
pub struct ResolveSpec {
    /// Display name used in step results, e.g. `"Get Provider"`.
    pub name: String,
    /// Listing path without query, e.g. `"/api/master/provider"`.
    pub list_path: String,
    /// Extra query fragment appended after page/size, e.g. `"&searchString="`.
    pub extra_query: String,
    pub page_size: usize,
    pub max_pages: usize,
    /// Identity to look for (bound by the creation or fallback step).
    pub identity_field: StateField,
    /// Field to bind the resolved UUID into.
    pub id_field: StateField,
    /// Whether listing rows echo the email reliably enough to match on it.
    pub match_email: bool,
}

impl ResolveSpec {
    fn page_path(&self, page: usize) -> String {
        format!(
            "{}?page={}&size={}{}",
            self.list_path, page, self.page_size, self.extra_query
        )
    }

    fn matches(&self, row: &Value, identity: &GeneratedIdentity) -> bool {
        let field = |key: &str| row.get(key).and_then(Value::as_str);
        let names_match = field("firstName") == Some(identity.first_name.as_str())
            && field("lastName") == Some(identity.last_name.as_str());
        if !names_match {
            return false;
        }
        if self.match_email {
            field("email") == Some(identity.email.as_str())
        } else {
            true
        }
    }
}

/// Scan the listing page by page until the identity matches exactly one
/// row, then bind its `uuid`. Appends exactly one [`StepResult`].
pub async fn execute_resolve(
    client: &dyn ApiClient,
    spec: &ResolveSpec,
    state: &mut WorkflowState,
    reporter: &mut Reporter,
) -> StepOutcome {
    let (identity, token) = match (state.identity(spec.identity_field), state.access_token()) {
        (Ok(identity), Ok(token)) => (identity.clone(), token.to_string()),
        (Err(err), _) | (_, Err(err)) => {
            reporter.record(StepResult::error(
                &spec.name,
                format!("precondition: {}", err),
            ));
            return StepOutcome::Error;
        }
    };

    for page in 0..spec.max_pages {
        let request = ApiRequest::get(spec.page_path(page)).with_bearer(&token);
        let response = match client.send(&request).await {
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

        let Some(content) = content_of(&response.body) else {
            reporter.record(StepResult::fail(
                &spec.name,
                Some(response.status),
                "listing body lacked data.content".to_string(),
            ));
            return StepOutcome::Fail;
        };

        let matched: Vec<&Value> = content
            .iter()
            .filter(|row| spec.matches(row, &identity))
            .collect();

        match matched.len() {
            0 => {
                tracing::debug!(
                    step = %spec.name,
                    page,
                    rows = content.len(),
                    "no match on page"
                );
                // A short page is the last page.
                if content.len() < spec.page_size {
                    break;
                }
            }
            1 => {
                let Some(uuid) = matched[0].get("uuid").and_then(Value::as_str) else {
                    reporter.record(StepResult::fail(
                        &spec.name,
                        Some(response.status),
                        format!(
                            "matched {} {} but the row carried no uuid",
                            identity.first_name, identity.last_name
                        ),
                    ));
                    return StepOutcome::Fail;
                };
                if let Err(err) = state.set_text(spec.id_field, uuid) {
                    reporter.record(StepResult::error(&spec.name, err.to_string()));
                    return StepOutcome::Error;
                }
                reporter.record(StepResult::pass(
                    &spec.name,
                    response.status,
                    format!(
                        "matched {} {} on page {} -> {}",
                        identity.first_name, identity.last_name, page, uuid
                    ),
                ));
                return StepOutcome::Pass;
            }
            n => {
                reporter.record(StepResult::fail(
                    &spec.name,
                    Some(response.status),
                    format!(
                        "{} rows match {} {}; identity is not unique",
                        n, identity.first_name, identity.last_name
                    ),
                ));
                return StepOutcome::Fail;
            }
        }
    }

    reporter.record(StepResult::fail(
        &spec.name,
        None,
        format!(
            "{} {} not found within {} pages; created entity never appeared in the listing",
            identity.first_name, identity.last_name, spec.max_pages
        ),
    ));
    StepOutcome::Fail
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::scripted::ScriptedClient;
    use crate::client::Method;
    use serde_json::json;

    fn provider_spec() -> ResolveSpec {
        ResolveSpec {
            name: "Get Provider".to_string(),
            list_path: "/api/master/provider".to_string(),
            extra_query: String::new(),
            page_size: 2,
            max_pages: 5,
            identity_field: StateField::ProviderIdentity,
            id_field: StateField::ProviderId,
            match_email: true,
        }
    }

    fn identity() -> GeneratedIdentity {
        GeneratedIdentity {
            first_name: "James101".to_string(),
            last_name: "Miller".to_string(),
            email: "test_james101_17@example.com".to_string(),
            phone: None,
        }
    }

    fn row(first: &str, last: &str, email: &str, uuid: &str) -> Value {
        json!({"firstName": first, "lastName": last, "email": email, "uuid": uuid})
    }

    fn page(rows: Vec<Value>) -> Value {
        json!({"data": {"content": rows}})
    }

    fn ready_state() -> WorkflowState {
        let mut state = WorkflowState::new();
        state.set_text(StateField::AccessToken, "tok-1").unwrap();
        state
            .set_identity(StateField::ProviderIdentity, identity())
            .unwrap();
        state
    }

    #[tokio::test]
    async fn finds_match_on_first_page() {
        let client = ScriptedClient::new();
        client.respond(
            Method::Get,
            "/api/master/provider?page=0",
            200,
            page(vec![row(
                "James101",
                "Miller",
                "test_james101_17@example.com",
                "uuid-7",
            )]),
        );

        let mut state = ready_state();
        let mut reporter = Reporter::new();
        let outcome = execute_resolve(&client, &provider_spec(), &mut state, &mut reporter).await;

        assert_eq!(outcome, StepOutcome::Pass);
        assert_eq!(state.provider_id().unwrap(), "uuid-7");
        assert!(reporter.results()[0].detail.contains("page 0"));
    }

    #[tokio::test]
    async fn walks_pages_until_match() {
        let client = ScriptedClient::new();
        // Page 0 is full but has no match; the scan continues.
        client.respond(
            Method::Get,
            "/api/master/provider?page=0",
            200,
            page(vec![
                row("Other", "Person", "o@example.com", "uuid-1"),
                row("Another", "Person", "a@example.com", "uuid-2"),
            ]),
        );
        client.respond(
            Method::Get,
            "/api/master/provider?page=1",
            200,
            page(vec![row(
                "James101",
                "Miller",
                "test_james101_17@example.com",
                "uuid-9",
            )]),
        );

        let mut state = ready_state();
        let mut reporter = Reporter::new();
        let outcome = execute_resolve(&client, &provider_spec(), &mut state, &mut reporter).await;

        assert_eq!(outcome, StepOutcome::Pass);
        assert_eq!(state.provider_id().unwrap(), "uuid-9");
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn short_page_without_match_fails() {
        let client = ScriptedClient::new();
        client.respond(
            Method::Get,
            "/api/master/provider?page=0",
            200,
            page(vec![row("Other", "Person", "o@example.com", "uuid-1")]),
        );

        let mut state = ready_state();
        let mut reporter = Reporter::new();
        let outcome = execute_resolve(&client, &provider_spec(), &mut state, &mut reporter).await;

        assert_eq!(outcome, StepOutcome::Fail);
        assert!(reporter.results()[0].detail.contains("never appeared"));
        // Scan stopped at the short page instead of burning the budget.
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn ambiguous_match_fails() {
        let client = ScriptedClient::new();
        client.respond(
            Method::Get,
            "/api/master/provider?page=0",
            200,
            page(vec![
                row("James101", "Miller", "test_james101_17@example.com", "u1"),
                row("James101", "Miller", "test_james101_17@example.com", "u2"),
            ]),
        );

        let mut state = ready_state();
        let mut reporter = Reporter::new();
        let outcome = execute_resolve(&client, &provider_spec(), &mut state, &mut reporter).await;

        assert_eq!(outcome, StepOutcome::Fail);
        assert!(reporter.results()[0].detail.contains("not unique"));
    }

    #[tokio::test]
    async fn email_ignored_when_listing_does_not_echo_it() {
        let spec = ResolveSpec {
            match_email: false,
            extra_query: "&searchString=".to_string(),
            ..provider_spec()
        };
        let client = ScriptedClient::new();
        client.respond(
            Method::Get,
            "/api/master/provider?page=0",
            200,
            page(vec![json!({
                "firstName": "James101",
                "lastName": "Miller",
                "email": null,
                "uuid": "uuid-3"
            })]),
        );

        let mut state = ready_state();
        let mut reporter = Reporter::new();
        let outcome = execute_resolve(&client, &spec, &mut state, &mut reporter).await;

        assert_eq!(outcome, StepOutcome::Pass);
        assert_eq!(state.provider_id().unwrap(), "uuid-3");
        // The extra query fragment rode along on the listing request.
        assert!(client.requests()[0].path.contains("&searchString="));
    }

    #[tokio::test]
    async fn missing_identity_is_a_precondition_error() {
        let client = ScriptedClient::new();
        let mut state = WorkflowState::new();
        state.set_text(StateField::AccessToken, "tok-1").unwrap();
        let mut reporter = Reporter::new();

        let outcome = execute_resolve(&client, &provider_spec(), &mut state, &mut reporter).await;

        assert_eq!(outcome, StepOutcome::Error);
        assert!(client.requests().is_empty());
    }
}
