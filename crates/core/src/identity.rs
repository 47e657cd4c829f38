//! Randomized provider/patient identities.
//!
//! Multiple probe runs share one remote tenant, so generated names and
//! emails must not collide across concurrent runs. Entropy comes from a
//! wall-clock millisecond timestamp plus a random suffix; a monotonic guard
//! keeps two in-process calls from ever landing on the same millisecond.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const FIRST_NAMES: &[&str] = &[
    "James", "Robert", "John", "Michael", "William", "David", "Richard", "Joseph", "Thomas",
    "Christopher", "Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Barbara", "Susan",
    "Jessica", "Sarah", "Karen",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Wilson", "Anderson", "Taylor", "Moore", "Jackson", "Martin", "Lee", "Thompson",
    "White", "Harris",
];

/// A generated person record used both as creation payload and as the
/// lookup key for entities the remote API creates without returning an ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Produces unique identities for one process.
///
/// Not deterministic, but reproducible-enough for logs: the email embeds
/// both the random suffix and the timestamp that produced it.
#[derive(Debug, Default)]
pub struct IdentityGenerator {
    last_millis: u128,
}

impl IdentityGenerator {
    pub fn new() -> Self {
        IdentityGenerator::default()
    }

    pub fn generate(&mut self) -> GeneratedIdentity {
        let mut rng = rand::thread_rng();

        let mut millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        if millis <= self.last_millis {
            millis = self.last_millis + 1;
        }
        self.last_millis = millis;

        let suffix: u32 = rng.gen_range(0..1000);
        let first_base = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
        let last_name = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];

        GeneratedIdentity {
            first_name: format!("{}{}", first_base, suffix),
            last_name: last_name.to_string(),
            email: format!(
                "test_{}{}_{}@example.com",
                first_base.to_lowercase(),
                suffix,
                millis
            ),
            phone: Some(format!("+1555{:07}", rng.gen_range(0..10_000_000u32))),
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
