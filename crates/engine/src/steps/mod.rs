//! Concrete workflow steps against the scheduling API.
//!
//! Payload shapes mirror what the remote's own frontend sends; several
//! endpoints reject requests that omit fields they never read, so the
//! payloads carry more than the engine itself cares about.

pub mod appointment;
pub mod auth;
pub mod encounter;
pub mod patient;
pub mod provider;

pub use appointment::{
    BookAppointmentStep, GetAppointmentStep, TelehealthTokenStep, UpdateStatusStep,
};
pub use auth::LoginStep;
pub use encounter::{SaveEncounterStep, SignOffEncounterStep, UpdateEncounterStep};
pub use patient::AddPatientStep;
pub use provider::{AddProviderStep, SetAvailabilityStep};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub(crate) fn rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| "invalid-time".to_string())
}
