//! The standard booking workflow: an ordered walk from login to a signed
//! encounter, with one report entry per attempted step.
//!
//! The walker is deliberately forgiving: apart from authentication, a
//! failed step records its result and the run keeps going, because a
//! half-complete run against a flaky stage environment still answers more
//! questions than an early abort.


use carewalk_core::{
    slot_candidates, IdentityGenerator, Reporter, RunPhase, SlotCandidate, StateField, StepOutcome,
    WorkflowState,
};
use time::OffsetDateTime;

use crate::client::ApiClient;
use crate::config::ApiConfig;
use crate::executor::execute_api_step;
use crate::resolve::{execute_resolve, ResolveSpec};
use crate::retry::{adopt_existing, book_with_retry, FallbackSpec, RetryPolicy};
use crate::step::ApiStep;
use crate::steps::{
    AddPatientStep, AddProviderStep, BookAppointmentStep, GetAppointmentStep, LoginStep,
    SaveEncounterStep, SetAvailabilityStep, SignOffEncounterStep, TelehealthTokenStep,
    UpdateEncounterStep, UpdateStatusStep,
};

// ──────────────────────────────────────────────
// RunPolicy
// ──────────────────────────────────────────────

/// Tunables for one workflow run.
#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Minimum success rate (percent) for the run to count as passing.
    pub min_success_rate: u8,
    pub retry: RetryPolicy,
    /// Page budget for create-then-resolve listing scans.
    pub resolve_page_limit: usize,
    pub page_size: usize,
    /// Stop at the first hard error instead of recording it and moving on.
    pub halt_on_error: bool,
    /// How many slot candidates to generate for booking.
    pub slot_count: usize,
    /// Days between "now" and the first candidate date.
    pub slot_lead_days: i64,
    pub visit_minutes: i64,
    pub skip_weekends: bool,
    /// Pause after configuring availability, giving the remote calendar
    /// time to materialize slots before booking against them.
    pub settle_after_availability: std::time::Duration,
}

impl Default for RunPolicy {
    fn default() -> Self {
        RunPolicy {
            min_success_rate: 75,
            retry: RetryPolicy::default(),
            resolve_page_limit: 10,
            page_size: 20,
            halt_on_error: false,
            slot_count: 8,
            slot_lead_days: 3,
            visit_minutes: 30,
            skip_weekends: true,
            settle_after_availability: std::time::Duration::from_secs(2),
        }
    }
}

// ──────────────────────────────────────────────
// WorkflowStep / WorkflowError
// ──────────────────────────────────────────────

/// One position in the workflow sequence. `Api` is a plain step;
/// `Create` carries a fallback; `Resolve` and `Booking` are the
/// multi-request operations.
pub enum WorkflowStep {
    Api {
        step: Box<dyn ApiStep>,
        /// Phase to promote to when the step passes.
        phase: Option<RunPhase>,
        /// A failure here makes the rest of the run unreachable.
        fatal: bool,
    },
    Create {
        step: Box<dyn ApiStep>,
        fallback: FallbackSpec,
        /// Phase to promote to when the fallback adoption succeeds (the
        /// fresh-creation path reaches it through the resolve step).
        adopted_phase: Option<RunPhase>,
    },
    Resolve {
        spec: ResolveSpec,
        phase: Option<RunPhase>,
    },
    Booking {
        candidates: Vec<SlotCandidate>,
    },
    /// Pure wait; records nothing.
    Settle {
        wait: std::time::Duration,
    },
}

const BOOKING_REQUIRES: &[StateField] = &[
    StateField::AccessToken,
    StateField::ProviderId,
    StateField::PatientId,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("step '{step}' requires '{field}' but no earlier step produces it")]
    UnsatisfiedDependency {
        step: String,
        field: StateField,
    },
}

// ──────────────────────────────────────────────
// RunOutcome
// ──────────────────────────────────────────────

/// Everything a caller needs after a run: how far it got, every step
/// result, and whether it was cut short.
pub struct RunOutcome {
    pub phase: RunPhase,
    pub reporter: Reporter,
    /// Why the run stopped early, when it did.
    pub aborted: Option<String>,
}

impl RunOutcome {
    /// Whether the run clears the success-rate gate.
    pub fn passes_gate(
        &self,
        min_success_rate: u8,
    ) -> Result<bool, carewalk_core::ReportError> {
        Ok(self.reporter.summary()?.success_rate >= min_success_rate)
    }
}

// ──────────────────────────────────────────────
// Workflow
// ──────────────────────────────────────────────

pub struct Workflow {
    steps: Vec<WorkflowStep>,
    policy: RunPolicy,
    /// Tenant for the booking payloads built per retry attempt.
    tenant: String,
}

impl Workflow {
    /// The standard sequence with freshly generated identities and slot
    /// candidates anchored at the current time.
    pub fn standard(config: &ApiConfig, policy: RunPolicy) -> Self {
        let mut generator = IdentityGenerator::new();
        let provider = generator.generate();
        let patient = generator.generate();
        let candidates = slot_candidates(
            policy.slot_count,
            OffsetDateTime::now_utc(),
            policy.slot_lead_days,
            time::Duration::minutes(policy.visit_minutes),
            policy.skip_weekends,
        );
        Self::with_parts(config, policy, provider, patient, candidates)
    }

    /// The standard sequence with caller-chosen identities and slots.
    pub fn with_parts(
        config: &ApiConfig,
        policy: RunPolicy,
        provider: carewalk_core::GeneratedIdentity,
        patient: carewalk_core::GeneratedIdentity,
        candidates: Vec<SlotCandidate>,
    ) -> Self {
        let tenant = config.tenant.clone();
        let steps = vec![
            WorkflowStep::Api {
                step: Box::new(LoginStep {
                    username: config.username.clone(),
                    password: config.password.clone(),
                    tenant: tenant.clone(),
                }),
                phase: Some(RunPhase::Authenticated),
                fatal: true,
            },
            WorkflowStep::Create {
                step: Box::new(AddProviderStep { identity: provider }),
                fallback: FallbackSpec {
                    name: "Use Existing Provider".to_string(),
                    list_path: "/api/master/provider".to_string(),
                    extra_query: String::new(),
                    id_field: StateField::ProviderId,
                    identity_field: StateField::ProviderIdentity,
                },
                adopted_phase: Some(RunPhase::ProviderReady),
            },
            WorkflowStep::Resolve {
                spec: ResolveSpec {
                    name: "Get Provider".to_string(),
                    list_path: "/api/master/provider".to_string(),
                    extra_query: String::new(),
                    page_size: policy.page_size,
                    max_pages: policy.resolve_page_limit,
                    identity_field: StateField::ProviderIdentity,
                    id_field: StateField::ProviderId,
                    match_email: true,
                },
                phase: Some(RunPhase::ProviderReady),
            },
            WorkflowStep::Api {
                step: Box::new(SetAvailabilityStep {
                    tenant: tenant.clone(),
                }),
                phase: Some(RunPhase::AvailabilitySet),
                fatal: false,
            },
            WorkflowStep::Settle {
                wait: policy.settle_after_availability,
            },
            WorkflowStep::Create {
                step: Box::new(AddPatientStep { identity: patient }),
                fallback: FallbackSpec {
                    name: "Use Existing Patient".to_string(),
                    list_path: "/api/master/patient".to_string(),
                    extra_query: "&searchString=".to_string(),
                    id_field: StateField::PatientId,
                    identity_field: StateField::PatientIdentity,
                },
                adopted_phase: Some(RunPhase::PatientReady),
            },
            WorkflowStep::Resolve {
                spec: ResolveSpec {
                    name: "Get Patient".to_string(),
                    list_path: "/api/master/patient".to_string(),
                    extra_query: "&searchString=".to_string(),
                    page_size: policy.page_size,
                    max_pages: policy.resolve_page_limit,
                    identity_field: StateField::PatientIdentity,
                    id_field: StateField::PatientId,
                    match_email: false,
                },
                phase: Some(RunPhase::PatientReady),
            },
            WorkflowStep::Booking { candidates },
            WorkflowStep::Api {
                step: Box::new(GetAppointmentStep),
                phase: None,
                fatal: false,
            },
            WorkflowStep::Api {
                step: Box::new(UpdateStatusStep::confirm(tenant.clone())),
                phase: Some(RunPhase::Confirmed),
                fatal: false,
            },
            WorkflowStep::Api {
                step: Box::new(UpdateStatusStep::check_in(tenant.clone())),
                phase: Some(RunPhase::CheckedIn),
                fatal: false,
            },
            WorkflowStep::Api {
                step: Box::new(TelehealthTokenStep),
                phase: None,
                fatal: false,
            },
            WorkflowStep::Api {
                step: Box::new(SaveEncounterStep {
                    tenant: tenant.clone(),
                }),
                phase: Some(RunPhase::EncounterOpen),
                fatal: false,
            },
            WorkflowStep::Api {
                step: Box::new(UpdateEncounterStep {
                    tenant: tenant.clone(),
                }),
                phase: None,
                fatal: false,
            },
            WorkflowStep::Api {
                step: Box::new(SignOffEncounterStep),
                phase: Some(RunPhase::EncounterSigned),
                fatal: false,
            },
        ];

        Workflow {
            steps,
            policy,
            tenant,
        }
    }

    /// Check that every step's required fields are produced by an earlier
    /// step (or its fallback). Catches sequencing mistakes before any
    /// request goes out.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let mut produced = std::collections::BTreeSet::new();
        for step in &self.steps {
            match step {
                WorkflowStep::Api { step, .. } => {
                    require_all(step.name(), step.requires(), &produced)?;
                    produced.extend(step.produces().iter().copied());
                }
                WorkflowStep::Create { step, fallback, .. } => {
                    require_all(step.name(), step.requires(), &produced)?;
                    produced.extend(step.produces().iter().copied());
                    produced.insert(fallback.id_field);
                    produced.insert(fallback.identity_field);
                }
                WorkflowStep::Resolve { spec, .. } => {
                    require_all(
                        &spec.name,
                        &[StateField::AccessToken, spec.identity_field],
                        &produced,
                    )?;
                    produced.insert(spec.id_field);
                }
                WorkflowStep::Booking { .. } => {
                    require_all("Book Appointment", BOOKING_REQUIRES, &produced)?;
                }
                WorkflowStep::Settle { .. } => {}
            }
        }
        Ok(())
    }

    /// Execute the workflow against `client`.
    pub async fn run(&self, client: &dyn ApiClient) -> Result<RunOutcome, WorkflowError> {
        self.validate()?;

        let mut state = WorkflowState::new();
        let mut reporter = Reporter::new();
        let mut phase = RunPhase::Init;
        let mut aborted = None;

        'walk: for step in &self.steps {
            let outcome = match step {
                WorkflowStep::Api {
                    step,
                    phase: promote,
                    fatal,
                } => {
                    let outcome =
                        execute_api_step(client, step.as_ref(), &mut state, &mut reporter).await;
                    if outcome == StepOutcome::Pass {
                        if let Some(next) = promote {
                            phase = phase.advance(*next);
                        }
                    } else if *fatal {
                        let detail = last_detail(&reporter);
                        tracing::error!(step = step.name(), %detail, "fatal step failed, aborting run");
                        aborted = Some(format!("{} failed: {}", step.name(), detail));
                        break 'walk;
                    }
                    outcome
                }
                WorkflowStep::Create {
                    step,
                    fallback,
                    adopted_phase,
                } => {
                    let outcome =
                        execute_api_step(client, step.as_ref(), &mut state, &mut reporter).await;
                    if outcome == StepOutcome::Pass {
                        outcome
                    } else {
                        let adopted =
                            adopt_existing(client, fallback, &mut state, &mut reporter).await;
                        if adopted == StepOutcome::Pass {
                            if let Some(next) = adopted_phase {
                                phase = phase.advance(*next);
                            }
                        }
                        adopted
                    }
                }
                WorkflowStep::Resolve {
                    spec,
                    phase: promote,
                } => {
                    if state.is_bound(spec.id_field) {
                        tracing::info!(step = %spec.name, "id already bound by fallback, skipping lookup");
                        continue;
                    }
                    let outcome = execute_resolve(client, spec, &mut state, &mut reporter).await;
                    if outcome == StepOutcome::Pass {
                        if let Some(next) = promote {
                            phase = phase.advance(*next);
                        }
                    }
                    outcome
                }
                WorkflowStep::Booking { candidates } => {
                    let tenant = self.tenant.clone();
                    let outcome = book_with_retry(
                        client,
                        &mut state,
                        &mut reporter,
                        candidates,
                        &self.policy.retry,
                        |slot| {
                            Box::new(BookAppointmentStep {
                                slot: *slot,
                                tenant: tenant.clone(),
                            })
                        },
                    )
                    .await;
                    phase = phase.advance(if outcome == StepOutcome::Pass {
                        RunPhase::AppointmentBooked
                    } else {
                        RunPhase::BookingFailed
                    });
                    outcome
                }
                WorkflowStep::Settle { wait } => {
                    if !wait.is_zero() {
                        tracing::debug!(?wait, "letting the remote calendar settle");
                        tokio::time::sleep(*wait).await;
                    }
                    continue;
                }
            };

            if outcome == StepOutcome::Error && self.policy.halt_on_error {
                let detail = last_detail(&reporter);
                aborted = Some(format!("halted on hard error: {}", detail));
                break;
            }
        }

        Ok(RunOutcome {
            phase,
            reporter,
            aborted,
        })
    }
}

fn require_all(
    step: &str,
    fields: &[StateField],
    produced: &std::collections::BTreeSet<StateField>,
) -> Result<(), WorkflowError> {
    for field in fields {
        if !produced.contains(field) {
            return Err(WorkflowError::UnsatisfiedDependency {
                step: step.to_string(),
                field: *field,
            });
        }
    }
    Ok(())
}

fn last_detail(reporter: &Reporter) -> String {
    reporter
        .results()
        .last()
        .map(|r| r.detail.clone())
        .unwrap_or_else(|| "no result recorded".to_string())
}
