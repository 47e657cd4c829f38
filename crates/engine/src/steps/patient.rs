//! Patient creation.

use carewalk_core::{GeneratedIdentity, StateError, StateField, WorkflowState};
use serde_json::json;

use crate::client::{ApiRequest, ApiResponse};
use crate::step::{ApiStep, ExtractError};

/// Creates a patient. Like providers, creation returns only a message;
/// the submitted identity is bound for the resolve step.
pub struct AddPatientStep {
    pub identity: GeneratedIdentity,
}

impl ApiStep for AddPatientStep {
    fn name(&self) -> &str {
        "Add Patient"
    }

    fn requires(&self) -> &[StateField] {
        &[StateField::AccessToken]
    }

    fn produces(&self) -> &[StateField] {
        &[StateField::PatientIdentity]
    }

    fn request(&self, state: &WorkflowState) -> Result<ApiRequest, StateError> {
        let token = state.access_token()?;
        Ok(ApiRequest::post(
            "/api/master/patient",
            json!({
                "phoneNotAvailable": true,
                "emailNotAvailable": true,
                "registrationDate": "",
                "firstName": self.identity.first_name,
                "middleName": "",
                "lastName": self.identity.last_name,
                "timezone": "EST",
                "birthDate": "1994-08-16T18:30:00.000Z",
                "gender": "MALE",
                "ssn": "",
                "mrn": "",
                "languages": null,
                "avatar": "",
                "mobileNumber": "",
                "faxNumber": "",
                "homePhone": "",
                "email": self.identity.email,
                "address": {
                    "line1": "",
                    "line2": "",
                    "city": "",
                    "state": "",
                    "country": "",
                    "zipcode": "",
                },
                "emergencyContacts": [],
                "patientInsurances": [],
                "patientAllergies": [],
                "patientVitals": [],
            }),
        )
        .with_bearer(token))
    }

    fn acceptable(&self, status: u16) -> bool {
        status == 201
    }

    fn validate(&self, response: &ApiResponse) -> Result<(), String> {
        match response.message() {
            Some("Patient Details Added Successfully.") => Ok(()),
            Some(other) => Err(format!("unexpected message: {}", other)),
            None => Err("creation response carried no message".to_string()),
        }
    }

    fn extract(
        &self,
        _response: &ApiResponse,
        state: &mut WorkflowState,
    ) -> Result<(), ExtractError> {
        state.set_identity(StateField::PatientIdentity, self.identity.clone())?;
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
