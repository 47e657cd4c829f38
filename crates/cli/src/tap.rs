//! TAP (Test Anything Protocol) v14 rendering of a run's step results.

use carewalk_core::{StepOutcome, StepResult};

/// One rendered test point plus its diagnostic lines.
struct TapLine {
    ok: bool,
    description: String,
    diagnostics: Vec<String>,
}

pub struct Tap {
    lines: Vec<TapLine>,
}

impl Tap {
    /// Build the stream from recorded step results. Failed steps carry
    /// their detail as diagnostics; hard errors are marked as such.
    pub fn from_results(results: &[StepResult]) -> Self {
        let lines = results
            .iter()
            .map(|result| {
                let description = match result.http_status {
                    Some(status) => format!("{} ({})", result.name, status),
                    None => result.name.clone(),
                };
                let (ok, diagnostics) = match result.outcome {
                    StepOutcome::Pass => (true, Vec::new()),
                    StepOutcome::Fail => {
                        (false, result.detail.lines().map(str::to_string).collect())
                    }
                    StepOutcome::Error => (false, vec![format!("error: {}", result.detail)]),
                };
                TapLine {
                    ok,
                    description,
                    diagnostics,
                }
            })
            .collect();
        Tap { lines }
    }

    pub fn failure_count(&self) -> usize {
        self.lines.iter().filter(|line| !line.ok).count()
    }

    /// The full TAP v14 document. The caller appends its own summary
    /// comments after the stream.
    pub fn render(&self) -> String {
        let mut out = format!("TAP version 14\n1..{}\n", self.lines.len());
        for (i, line) in self.lines.iter().enumerate() {
            let verdict = if line.ok { "ok" } else { "not ok" };
            out.push_str(&format!("{} {} - {}\n", verdict, i + 1, line.description));
            for diag in &line.diagnostics {
                // TAP diagnostics are prefixed with "# "
                out.push_str(&format!("  # {}\n", diag));
            }
        }
        out
    }

    pub fn finish(self) {
        print!("{}", self.render());
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_emits_plan_points_and_diagnostics() {
        let results = vec![
            StepResult::pass("Login", 200, "ok"),
            StepResult::fail("Book Appointment", Some(409), "slot not available"),
            StepResult::error("Get Provider", "connection reset"),
        ];
        let tap = Tap::from_results(&results);
        assert_eq!(tap.failure_count(), 2);

        let doc = tap.render();
        assert!(doc.starts_with("TAP version 14\n1..3\n"));
        assert!(doc.contains("ok 1 - Login (200)\n"));
        assert!(doc.contains("not ok 2 - Book Appointment (409)\n  # slot not available\n"));
        assert!(doc.contains("not ok 3 - Get Provider\n  # error: connection reset\n"));
    }
}
