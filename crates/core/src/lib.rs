//! carewalk-core: domain types for the scheduling workflow probe.
//!
//! Pure data and invariants, no I/O:
//!
//! - [`WorkflowState`] -- write-once per-run state store
//! - [`RunPhase`] -- the per-run lifecycle state machine
//! - [`IdentityGenerator`] -- collision-resistant provider/patient identities
//! - [`slot_candidates()`] -- disjoint appointment slot proposals
//! - [`Reporter`] / [`Report`] -- append-only step results and the derived summary

pub mod identity;
pub mod report;
pub mod slots;
pub mod state;

pub use identity::{GeneratedIdentity, IdentityGenerator};
pub use report::{Report, ReportError, Reporter, StepOutcome, StepResult};
pub use slots::{slot_candidates, SlotCandidate};
pub use state::{RunPhase, StateError, StateField, WorkflowState};
