//! Per-run workflow state store.
//!
//! One [`WorkflowState`] is owned by exactly one workflow run and dropped
//! with it. Fields are write-once: the step that produces a value binds it,
//! and no later step may rebind it to something else. Reads of unbound
//! fields fail rather than defaulting, so a missing dependency surfaces at
//! the step that needs it, not three steps later as a bad request.

use std::collections::BTreeMap;
use std::fmt;

use crate::identity::GeneratedIdentity;

// ──────────────────────────────────────────────
// StateField
// ──────────────────────────────────────────────

/// The cross-step state slots a workflow run can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StateField {
    AccessToken,
    ProviderId,
    PatientId,
    AppointmentId,
    EncounterId,
    ProviderIdentity,
    PatientIdentity,
}

impl StateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::AccessToken => "access_token",
            StateField::ProviderId => "provider_id",
            StateField::PatientId => "patient_id",
            StateField::AppointmentId => "appointment_id",
            StateField::EncounterId => "encounter_id",
            StateField::ProviderIdentity => "provider_identity",
            StateField::PatientIdentity => "patient_identity",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// StateError
// ──────────────────────────────────────────────

/// Errors from the write-once state contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// A field already bound to one value was rebound to a different one.
    #[error("state field '{field}' is already bound and cannot be rebound")]
    InvariantViolation { field: StateField },

    /// A field was read before any step produced it.
    #[error("state field '{field}' read before it was produced")]
    NotReady { field: StateField },

    /// A field holds a value of a different kind than the reader expected.
    #[error("state field '{field}' holds {actual}, expected {expected}")]
    WrongKind {
        field: StateField,
        expected: &'static str,
        actual: &'static str,
    },
}

// ──────────────────────────────────────────────
// WorkflowState
// ──────────────────────────────────────────────

/// A value bound into the state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Text(String),
    Identity(GeneratedIdentity),
}

impl StateValue {
    fn kind(&self) -> &'static str {
        match self {
            StateValue::Text(_) => "text",
            StateValue::Identity(_) => "identity",
        }
    }
}

/// Write-once state accumulated across the steps of one workflow run.
#[derive(Debug, Default)]
pub struct WorkflowState {
    bound: BTreeMap<StateField, StateValue>,
}

impl WorkflowState {
    pub fn new() -> Self {
        WorkflowState::default()
    }

    /// Bind a field. Rebinding to the identical value is a no-op; rebinding
    /// to a different value fails with [`StateError::InvariantViolation`].
    pub fn set(&mut self, field: StateField, value: StateValue) -> Result<(), StateError> {
        match self.bound.get(&field) {
            Some(existing) if *existing == value => Ok(()),
            Some(_) => Err(StateError::InvariantViolation { field }),
            None => {
                self.bound.insert(field, value);
                Ok(())
            }
        }
    }

    /// Read a field, failing if no step has produced it yet.
    pub fn get(&self, field: StateField) -> Result<&StateValue, StateError> {
        self.bound
            .get(&field)
            .ok_or(StateError::NotReady { field })
    }

    pub fn is_bound(&self, field: StateField) -> bool {
        self.bound.contains_key(&field)
    }

    pub fn set_text(&mut self, field: StateField, value: impl Into<String>) -> Result<(), StateError> {
        self.set(field, StateValue::Text(value.into()))
    }

    pub fn set_identity(
        &mut self,
        field: StateField,
        identity: GeneratedIdentity,
    ) -> Result<(), StateError> {
        self.set(field, StateValue::Identity(identity))
    }

    /// Read a text-valued field.
    pub fn text(&self, field: StateField) -> Result<&str, StateError> {
        match self.get(field)? {
            StateValue::Text(s) => Ok(s),
            other => Err(StateError::WrongKind {
                field,
                expected: "text",
                actual: other.kind(),
            }),
        }
    }

    /// Read an identity-valued field.
    pub fn identity(&self, field: StateField) -> Result<&GeneratedIdentity, StateError> {
        match self.get(field)? {
            StateValue::Identity(id) => Ok(id),
            other => Err(StateError::WrongKind {
                field,
                expected: "identity",
                actual: other.kind(),
            }),
        }
    }

    pub fn access_token(&self) -> Result<&str, StateError> {
        self.text(StateField::AccessToken)
    }

    pub fn provider_id(&self) -> Result<&str, StateError> {
        self.text(StateField::ProviderId)
    }

    pub fn patient_id(&self) -> Result<&str, StateError> {
        self.text(StateField::PatientId)
    }

    pub fn appointment_id(&self) -> Result<&str, StateError> {
        self.text(StateField::AppointmentId)
    }

    pub fn encounter_id(&self) -> Result<&str, StateError> {
        self.text(StateField::EncounterId)
    }

    pub fn provider_identity(&self) -> Result<&GeneratedIdentity, StateError> {
        self.identity(StateField::ProviderIdentity)
    }

    pub fn patient_identity(&self) -> Result<&GeneratedIdentity, StateError> {
        self.identity(StateField::PatientIdentity)
    }
}

// ──────────────────────────────────────────────
// RunPhase
// ──────────────────────────────────────────────

/// Lifecycle state of a single workflow run.
///
/// Only the `Init -> Authenticated` transition is a hard gate: without a
/// bearer token no later step is reachable. Every other phase tolerates
/// individual step failure and simply holds position, trading strictness
/// for maximal information gathered per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    Init,
    Authenticated,
    ProviderReady,
    AvailabilitySet,
    PatientReady,
    AppointmentBooked,
    BookingFailed,
    Confirmed,
    CheckedIn,
    EncounterOpen,
    EncounterSigned,
}

impl RunPhase {
    /// Ordering rank; `BookingFailed` is a terminal sibling of
    /// `AppointmentBooked` and never advances past it.
    fn rank(&self) -> u8 {
        match self {
            RunPhase::Init => 0,
            RunPhase::Authenticated => 1,
            RunPhase::ProviderReady => 2,
            RunPhase::AvailabilitySet => 3,
            RunPhase::PatientReady => 4,
            RunPhase::AppointmentBooked | RunPhase::BookingFailed => 5,
            RunPhase::Confirmed => 6,
            RunPhase::CheckedIn => 7,
            RunPhase::EncounterOpen => 8,
            RunPhase::EncounterSigned => 9,
        }
    }

    /// Advance to `next` if it is a forward move; a booking failure pins the
    /// phase for the rest of the run.
    pub fn advance(self, next: RunPhase) -> RunPhase {
        if self == RunPhase::BookingFailed {
            return self;
        }
        if next.rank() > self.rank() {
            next
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Init => "INIT",
            RunPhase::Authenticated => "AUTHENTICATED",
            RunPhase::ProviderReady => "PROVIDER_READY",
            RunPhase::AvailabilitySet => "AVAILABILITY_SET",
            RunPhase::PatientReady => "PATIENT_READY",
            RunPhase::AppointmentBooked => "APPOINTMENT_BOOKED",
            RunPhase::BookingFailed => "APPOINTMENT_BOOKING_FAILED",
            RunPhase::Confirmed => "CONFIRMED",
            RunPhase::CheckedIn => "CHECKED_IN",
            RunPhase::EncounterOpen => "ENCOUNTER_OPEN",
            RunPhase::EncounterSigned => "ENCOUNTER_SIGNED",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str) -> GeneratedIdentity {
        GeneratedIdentity {
            first_name: "James101".to_string(),
            last_name: "Miller".to_string(),
            email: email.to_string(),
            phone: None,
        }
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut state = WorkflowState::new();
        state.set_text(StateField::AccessToken, "tok-1").unwrap();
        assert_eq!(state.access_token().unwrap(), "tok-1");
    }

    #[test]
    fn rebind_same_value_is_noop() {
        let mut state = WorkflowState::new();
        state.set_text(StateField::ProviderId, "uuid-1").unwrap();
        state.set_text(StateField::ProviderId, "uuid-1").unwrap();
        assert_eq!(state.provider_id().unwrap(), "uuid-1");
    }

    #[test]
    fn rebind_different_value_is_invariant_violation() {
        let mut state = WorkflowState::new();
        state.set_text(StateField::AccessToken, "tok-1").unwrap();
        let err = state.set_text(StateField::AccessToken, "tok-2").unwrap_err();
        assert_eq!(
            err,
            StateError::InvariantViolation {
                field: StateField::AccessToken
            }
        );
        // The original binding survives.
        assert_eq!(state.access_token().unwrap(), "tok-1");
    }

    #[test]
    fn read_unbound_field_is_not_ready() {
        let state = WorkflowState::new();
        let err = state.patient_id().unwrap_err();
        assert_eq!(
            err,
            StateError::NotReady {
                field: StateField::PatientId
            }
        );
    }

    #[test]
    fn identity_fields_are_typed() {
        let mut state = WorkflowState::new();
        state
            .set_identity(StateField::PatientIdentity, identity("a@example.com"))
            .unwrap();
        assert_eq!(state.patient_identity().unwrap().email, "a@example.com");

        let err = state.text(StateField::PatientIdentity).unwrap_err();
        assert!(matches!(err, StateError::WrongKind { .. }));
    }

    #[test]
    fn phase_advances_forward_only() {
        let phase = RunPhase::Init.advance(RunPhase::Authenticated);
        assert_eq!(phase, RunPhase::Authenticated);
        // A later step failing must not move the phase backwards.
        assert_eq!(phase.advance(RunPhase::Init), RunPhase::Authenticated);
    }

    #[test]
    fn booking_failure_pins_the_phase() {
        let phase = RunPhase::PatientReady.advance(RunPhase::BookingFailed);
        assert_eq!(phase, RunPhase::BookingFailed);
        assert_eq!(phase.advance(RunPhase::Confirmed), RunPhase::BookingFailed);
    }
}
