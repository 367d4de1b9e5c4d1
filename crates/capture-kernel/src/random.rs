//! Deterministic pseudo-random values.
//!
//! Participants never exchange raw randomness. Instead every "random"
//! choice (spawn spots, flee drift) is hashed from inputs that are already
//! synchronized, such as a group id and a tick number. Wall-clock time and
//! local counters must never be used as inputs.

use std::collections::BTreeMap;
use std::fmt::Display;

/// Separator between canonical `key:value` pairs.
const PAIR_SEPARATOR: char = '|';

/// Number of output buckets.
const BUCKETS: u32 = 1000;

/// Synchronized inputs to a deterministic value.
///
/// Keys are kept sorted, so insertion order never affects the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RngInputs {
    entries: BTreeMap<String, String>,
}

impl RngInputs {
    /// Creates an empty input set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input, replacing any previous value for the key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds an input in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Display) {
        self.entries.insert(key.into(), value.to_string());
    }

    /// Canonical form: sorted `key:value` pairs joined by `|`.
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(PAIR_SEPARATOR);
            }
            out.push_str(key);
            out.push(':');
            out.push_str(value);
        }
        out
    }
}

/// Rolling 32-bit hash (`h * 31 + unit`) over UTF-16 code units, wrapping
/// like a signed 32-bit integer.
fn rolling_hash(text: &str) -> i32 {
    text.encode_utf16().fold(0i32, |hash, unit| {
        (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit))
    })
}

/// Maps synchronized inputs to a value in `[-0.5, 0.5)`.
#[must_use]
pub fn deterministic_value(inputs: &RngInputs) -> f32 {
    let bucket = rolling_hash(&inputs.canonical()).unsigned_abs() % BUCKETS;
    bucket as f32 / BUCKETS as f32 - 0.5
}

/// Maps synchronized inputs to a value in `[min, max)`.
#[must_use]
pub fn deterministic_range(inputs: &RngInputs, min: f32, max: f32) -> f32 {
    min + (deterministic_value(inputs) + 0.5) * (max - min)
}
