//! Login step: credentials in, bearer token out.

use carewalk_core::{StateError, StateField, WorkflowState};
use serde_json::{json, Value};

use crate::client::{ApiRequest, ApiResponse};
use crate::step::{ApiStep, ExtractError};

pub struct LoginStep {
    pub username: String,
    pub password: String,
    pub tenant: String,
}

impl ApiStep for LoginStep {
    fn name(&self) -> &str {
        "Login"
    }

    fn produces(&self) -> &[StateField] {
        &[StateField::AccessToken]
    }

    fn request(&self, _state: &WorkflowState) -> Result<ApiRequest, StateError> {
        Ok(ApiRequest::post(
            "/api/master/login",
            json!({
                "username": self.username,
                "password": self.password,
                "xTENANTID": self.tenant,
            }),
        ))
    }

    fn acceptable(&self, status: u16) -> bool {
        status == 200
    }

    fn extract(
        &self,
        response: &ApiResponse,
        state: &mut WorkflowState,
    ) -> Result<(), ExtractError> {
        let token = response
            .body
            .get("data")
            .and_then(|d| d.get("access_token"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ExtractError::Missing("login response carried no access token".to_string())
            })?;
        state.set_text(StateField::AccessToken, token)?;
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Method;

    fn step() -> LoginStep {
        LoginStep {
            username: "probe@example.com".to_string(),
            password: "secret".to_string(),
            tenant: "stage_tenant".to_string(),
        }
    }

    #[test]
    fn request_carries_credentials_and_tenant() {
        let request = step().request(&WorkflowState::new()).unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/api/master/login");
        assert!(request.bearer.is_none());

        let body = request.body.unwrap();
        assert_eq!(body["username"], "probe@example.com");
        assert_eq!(body["xTENANTID"], "stage_tenant");
    }

    #[test]
    fn extract_binds_the_token() {
        let mut state = WorkflowState::new();
        let response = ApiResponse::new(200, json!({"data": {"access_token": "tok-9"}}));
        step().extract(&response, &mut state).unwrap();
        assert_eq!(state.access_token().unwrap(), "tok-9");
    }

    #[test]
    fn missing_token_is_an_extract_failure() {
        let mut state = WorkflowState::new();
        let response = ApiResponse::new(200, json!({"data": {}}));
        let err = step().extract(&response, &mut state).unwrap_err();
        assert!(matches!(err, ExtractError::Missing(_)));
    }

    #[test]
    fn empty_token_is_rejected() {
        let mut state = WorkflowState::new();
        let response = ApiResponse::new(200, json!({"data": {"access_token": ""}}));
        assert!(step().extract(&response, &mut state).is_err());
    }
}
