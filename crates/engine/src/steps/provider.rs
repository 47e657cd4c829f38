//! Provider creation and availability configuration.

use carewalk_core::{GeneratedIdentity, StateError, StateField, WorkflowState};
use serde_json::json;

use crate::client::{ApiRequest, ApiResponse};
use crate::step::{ApiStep, ExtractError};

// ──────────────────────────────────────────────
// AddProviderStep
// ──────────────────────────────────────────────

/// Creates a provider. The endpoint returns only a message, so the
/// submitted identity is bound into state for the resolve step to find.
pub struct AddProviderStep {
    pub identity: GeneratedIdentity,
}

impl ApiStep for AddProviderStep {
    fn name(&self) -> &str {
        "Add Provider"
    }

    fn requires(&self) -> &[StateField] {
        &[StateField::AccessToken]
    }

    fn produces(&self) -> &[StateField] {
        &[StateField::ProviderIdentity]
    }

    fn request(&self, state: &WorkflowState) -> Result<ApiRequest, StateError> {
        let token = state.access_token()?;
        Ok(ApiRequest::post(
            "/api/master/provider",
            json!({
                "roleType": "PROVIDER",
                "active": false,
                "admin_access": true,
                "status": false,
                "firstName": self.identity.first_name,
                "lastName": self.identity.last_name,
                "email": self.identity.email,
                "phone": self.identity.phone.clone().unwrap_or_default(),
                "gender": "MALE",
                "npi": "",
                "specialities": null,
                "groupNpiNumber": "",
                "licensedStates": null,
                "licenseNumber": "",
                "acceptedInsurances": null,
                "experience": "",
                "taxonomyNumber": "",
                "workLocations": null,
                "createdBy": "",
                "deaInformation": [],
                "licenceInformation": [],
                "role": "PROVIDER",
                "providerType": "",
                "bio": "",
                "expertise": "",
                "workExperience": "",
            }),
        )
        .with_bearer(token))
    }

    fn acceptable(&self, status: u16) -> bool {
        status == 201
    }

    fn validate(&self, response: &ApiResponse) -> Result<(), String> {
        match response.message() {
            Some("Provider created successfully.") => Ok(()),
            Some(other) => Err(format!("unexpected message: {}", other)),
            None => Err("creation response carried no message".to_string()),
        }
    }

    fn extract(
        &self,
        _response: &ApiResponse,
        state: &mut WorkflowState,
    ) -> Result<(), ExtractError> {
        state.set_identity(StateField::ProviderIdentity, self.identity.clone())?;
        Ok(())
    }
}

// ──────────────────────────────────────────────
// SetAvailabilityStep
// ──────────────────────────────────────────────

const ALL_DAYS: &[&str] = &[
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
    "SUNDAY",
];

/// Opens the provider's calendar around the clock so slot rejection can
/// only come from genuine collisions, not configuration gaps.
pub struct SetAvailabilityStep {
    pub tenant: String,
}

impl ApiStep for SetAvailabilityStep {
    fn name(&self) -> &str {
        "Set Availability"
    }

    fn requires(&self) -> &[StateField] {
        &[StateField::AccessToken, StateField::ProviderId]
    }

    fn request(&self, state: &WorkflowState) -> Result<ApiRequest, StateError> {
        let token = state.access_token()?;
        let provider_id = state.provider_id()?;

        let day_slots: Vec<serde_json::Value> = ALL_DAYS
            .iter()
            .map(|day| {
                json!({
                    "day": day,
                    "startTime": "00:00:00",
                    "endTime": "23:45:00",
                    "availabilityMode": "VIRTUAL",
                })
            })
            .collect();

        Ok(ApiRequest::post(
            "/api/master/provider/availability-setting",
            json!({
                "setToWeekdays": false,
                "providerId": provider_id,
                "bookingWindow": "30",
                "timezone": "EST",
                "bufferTime": 0,
                "initialConsultTime": 0,
                "followupConsultTime": 0,
                "settings": [{
                    "type": "NEW",
                    "slotTime": "30",
                    "minNoticeUnit": "8_HOUR",
                }],
                "blockDays": [],
                "daySlots": day_slots,
                "bookBefore": "undefined undefined",
                "xTENANTID": self.tenant,
            }),
        )
        .with_bearer(token))
    }

    fn acceptable(&self, status: u16) -> bool {
        status == 200
    }

    fn validate(&self, response: &ApiResponse) -> Result<(), String> {
        match response.message() {
            Some(msg) if msg.contains("Availability added successfully") => Ok(()),
            Some(other) => Err(format!("unexpected message: {}", other)),
            None => Err("availability response carried no message".to_string()),
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
