//! carewalk-engine — drives end-to-end probe runs against a healthcare
//! scheduling API.
//!
//! The engine walks a fixed workflow (login, provider and patient setup,
//! booking with retry, appointment lifecycle, encounter documentation),
//! records one result per attempted step, and summarizes the run as a
//! pass/fail report. Recovery behavior lives in [`retry`]; the step
//! catalog in [`steps`]; the walker in [`workflow`].

pub mod client;
pub mod config;
pub mod executor;
pub mod resolve;
pub mod retry;
pub mod step;
pub mod steps;
pub mod workflow;

pub use client::http::HttpClient;
pub use client::{ApiClient, ApiRequest, ApiResponse, Method, TransportError};
pub use config::{ApiConfig, ConfigError};
pub use resolve::ResolveSpec;
pub use retry::{FallbackSpec, RetryPolicy};
pub use step::{ApiStep, ExtractError};
pub use workflow::{RunOutcome, RunPolicy, Workflow, WorkflowError, WorkflowStep};
