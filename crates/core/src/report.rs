//! Append-only step results and the derived run report.
//!
//! Every attempted step (including each booking retry) appends exactly one
//! [`StepResult`]. The [`Report`] is derived on demand, never stored, so a
//! summary can be taken mid-run or at the end with the same code path.

use serde::Serialize;
use time::OffsetDateTime;

// ──────────────────────────────────────────────
// StepOutcome / StepResult
// ──────────────────────────────────────────────

/// Classification of a single step attempt.
///
/// `Fail` is an assertion mismatch (unexpected status or body); `Error` is
/// a transport or precondition problem where no meaningful response exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepOutcome {
    Pass,
    Fail,
    Error,
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepOutcome::Pass => "PASS",
            StepOutcome::Fail => "FAIL",
            StepOutcome::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// The outcome of one step attempt.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub name: String,
    pub outcome: StepOutcome,
    pub http_status: Option<u16>,
    pub detail: String,
    /// True when this result came from adopting a pre-existing remote
    /// entity instead of a fresh creation (a degraded run).
    pub fallback: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl StepResult {
    fn new(
        name: impl Into<String>,
        outcome: StepOutcome,
        http_status: Option<u16>,
        detail: impl Into<String>,
    ) -> Self {
        StepResult {
            name: name.into(),
            outcome,
            http_status,
            detail: detail.into(),
            fallback: false,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn pass(name: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        StepResult::new(name, StepOutcome::Pass, Some(status), detail)
    }

    pub fn fail(name: impl Into<String>, status: Option<u16>, detail: impl Into<String>) -> Self {
        StepResult::new(name, StepOutcome::Fail, status, detail)
    }

    pub fn error(name: impl Into<String>, detail: impl Into<String>) -> Self {
        StepResult::new(name, StepOutcome::Error, None, detail)
    }

    /// Mark this result as produced by fallback substitution.
    pub fn with_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }
}

// ──────────────────────────────────────────────
// Reporter / Report
// ──────────────────────────────────────────────

/// Error from summarizing a reporter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// No step result was ever recorded; a success rate would be 0/0.
    #[error("no step results recorded")]
    EmptyReport,
}

/// Derived summary over the recorded step results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    /// `round(100 * passed / total)`.
    pub success_rate: u8,
    /// True when any result was produced by fallback substitution.
    pub degraded: bool,
}

/// Append-only collector of step results for one workflow run.
#[derive(Debug, Default)]
pub struct Reporter {
    results: Vec<StepResult>,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    pub fn record(&mut self, result: StepResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn by_outcome(&self, outcome: StepOutcome) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(move |r| r.outcome == outcome)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Compute the summary. An empty result sequence is an error, not a 0%
    /// report, so callers cannot mistake "nothing ran" for "everything failed".
    pub fn summary(&self) -> Result<Report, ReportError> {
        if self.results.is_empty() {
            return Err(ReportError::EmptyReport);
        }
        let total = self.results.len();
        let passed = self.by_outcome(StepOutcome::Pass).count();
        let failed = self.by_outcome(StepOutcome::Fail).count();
        let errors = self.by_outcome(StepOutcome::Error).count();
        let success_rate = ((passed as f64 / total as f64) * 100.0).round() as u8;
        Ok(Report {
            total,
            passed,
            failed,
            errors,
            success_rate,
            degraded: self.results.iter().any(|r| r.fallback),
        })
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reporter_summary_is_an_error() {
        let reporter = Reporter::new();
        assert_eq!(reporter.summary().unwrap_err(), ReportError::EmptyReport);
    }

    #[test]
    fn summary_counts_and_rounds() {
        let mut reporter = Reporter::new();
        reporter.record(StepResult::pass("Login", 200, "ok"));
        reporter.record(StepResult::pass("Add Provider", 201, "ok"));
        reporter.record(StepResult::fail("Book Appointment", Some(200), "conflict"));

        let report = reporter.summary().unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors, 0);
        // 2/3 = 66.67 -> 67
        assert_eq!(report.success_rate, 67);
        assert!(!report.degraded);
    }

    #[test]
    fn errors_count_separately_from_failures() {
        let mut reporter = Reporter::new();
        reporter.record(StepResult::pass("Login", 200, "ok"));
        reporter.record(StepResult::error("Add Provider", "connection reset"));

        let report = reporter.summary().unwrap();
        assert_eq!(report.failed, 0);
        assert_eq!(report.errors, 1);
        assert_eq!(report.success_rate, 50);
    }

    #[test]
    fn fallback_marks_run_degraded() {
        let mut reporter = Reporter::new();
        reporter.record(StepResult::fail("Add Provider", Some(400), "rejected"));
        reporter.record(
            StepResult::pass("Use Existing Provider", 200, "adopted uuid-9").with_fallback(),
        );

        let report = reporter.summary().unwrap();
        assert!(report.degraded);
    }

    #[test]
    fn by_outcome_filters() {
        let mut reporter = Reporter::new();
        reporter.record(StepResult::pass("a", 200, ""));
        reporter.record(StepResult::fail("b", Some(409), ""));
        reporter.record(StepResult::fail("c", Some(409), ""));

        assert_eq!(reporter.by_outcome(StepOutcome::Fail).count(), 2);
        assert_eq!(reporter.by_outcome(StepOutcome::Error).count(), 0);
    }
}
