//! Appointment slot candidate generation.
//!
//! Booking against a shared availability calendar collides with whatever
//! other runs have already taken, so the retry controller works through an
//! ordered list of disjoint proposals rather than a single time. Candidate
//! times follow a spread-out time-of-day ladder (odd minutes, hours apart)
//! to keep the collision surface small.

use serde::Serialize;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, Weekday};

/// Preferred booking times within a day, ordered by preference.
/// Spaced far enough apart that consecutive candidates never overlap for
/// visit lengths up to two hours.
const PREFERRED_TIMES: &[(u8, u8)] = &[
    (1, 15),
    (3, 45),
    (6, 30),
    (9, 15),
    (13, 45),
    (16, 30),
    (19, 15),
    (22, 0),
];

/// One proposed `(start, end)` booking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotCandidate {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

/// Generate `n` disjoint slot candidates at or after `reference`, starting
/// `lead_days` ahead, each `visit` long. With `skip_weekends` set, Saturday
/// and Sunday dates are rolled forward to Monday.
pub fn slot_candidates(
    n: usize,
    reference: OffsetDateTime,
    lead_days: i64,
    visit: Duration,
    skip_weekends: bool,
) -> Vec<SlotCandidate> {
    let offset = reference.offset();
    let mut date = (reference + Duration::days(lead_days)).date();
    if skip_weekends {
        date = next_business_day(date);
    }

    let mut out: Vec<SlotCandidate> = Vec::with_capacity(n);
    'days: loop {
        for &(hour, minute) in PREFERRED_TIMES {
            if out.len() == n {
                break 'days;
            }
            let Ok(tod) = Time::from_hms(hour, minute, 0) else {
                continue;
            };
            let start = PrimitiveDateTime::new(date, tod).assume_offset(offset);
            if start < reference {
                continue;
            }
            // Disjointness guard for long visit durations.
            if let Some(prev) = out.last() {
                if start < prev.end {
                    continue;
                }
            }
            out.push(SlotCandidate {
                start,
                end: start + visit,
            });
        }
        match date.next_day() {
            Some(next) => {
                date = if skip_weekends {
                    next_business_day(next)
                } else {
                    next
                };
            }
            None => break,
        }
    }
    out
}

fn next_business_day(mut date: Date) -> Date {
    while matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday) {
        match date.next_day() {
            Some(next) => date = next,
            None => return date,
        }
    }
    date
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn returns_exactly_n_candidates() {
        let reference = datetime!(2025-03-03 08:00 UTC); // a Monday
        let slots = slot_candidates(8, reference, 3, Duration::minutes(30), true);
        assert_eq!(slots.len(), 8);
    }

    #[test]
    fn all_candidates_at_or_after_reference() {
        let reference = datetime!(2025-03-03 08:00 UTC);
        let slots = slot_candidates(12, reference, 0, Duration::minutes(30), false);
        assert!(slots.iter().all(|s| s.start >= reference));
    }

    #[test]
    fn candidates_are_disjoint_and_ordered() {
        let reference = datetime!(2025-03-03 00:00 UTC);
        let slots = slot_candidates(20, reference, 1, Duration::minutes(30), false);
        for pair in slots.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn weekend_dates_roll_to_monday() {
        // Thursday + 2 lead days lands on Saturday 2025-03-08.
        let reference = datetime!(2025-03-06 08:00 UTC);
        let slots = slot_candidates(10, reference, 2, Duration::minutes(30), true);
        for slot in &slots {
            let day = slot.start.weekday();
            assert!(!matches!(day, Weekday::Saturday | Weekday::Sunday));
        }
        // First candidate lands on the following Monday.
        assert_eq!(slots[0].start.date(), datetime!(2025-03-10 00:00 UTC).date());
    }

    #[test]
    fn weekends_kept_when_not_skipping() {
        let reference = datetime!(2025-03-06 08:00 UTC);
        let slots = slot_candidates(10, reference, 2, Duration::minutes(30), false);
        assert_eq!(slots[0].start.weekday(), Weekday::Saturday);
    }

    #[test]
    fn slot_duration_matches_visit_length() {
        let reference = datetime!(2025-03-03 08:00 UTC);
        let slots = slot_candidates(4, reference, 3, Duration::minutes(30), true);
        for slot in &slots {
            assert_eq!(slot.end - slot.start, Duration::minutes(30));
        }
    }
}
