//! Mutation gate: decides whether AI-produced text is an acceptable minimal
//! edit of the original.
//!
//! The gate is pure. It looks only at the two strings and the owning
//! target's length bounds.

mod fallback;

pub use fallback::fallback_mutation;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::TargetConfig;

/// Largest allowed relative length change between original and mutated text.
pub const MAX_LENGTH_DELTA: f64 = 0.15;

/// Why a mutation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// Mutated text is empty or whitespace.
    Empty,
    /// Length moved by more than MAX_LENGTH_DELTA.
    LengthDelta,
    /// Nothing changed.
    Identical,
    /// Outside the target's min/max content length.
    Truncated,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::Empty => "EMPTY",
            RejectReason::LengthDelta => "LENGTH_DELTA",
            RejectReason::Identical => "IDENTICAL",
            RejectReason::Truncated => "TRUNCATED",
        };
        f.write_str(s)
    }
}

/// Gate decision over one (original, mutated) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    pub original_text: String,
    pub mutated_text: String,
    pub accepted: bool,
    pub reject_reason: Option<RejectReason>,
    /// The mutated text came from the deterministic fallback.
    pub fallback_applied: bool,
}

impl MutationResult {
    /// Collapse into the tagged form the runner branches on.
    pub fn into_verdict(self) -> MutationVerdict {
        match (self.accepted, self.fallback_applied, self.reject_reason) {
            (true, false, _) => MutationVerdict::Accepted(self.mutated_text),
            (true, true, _) => MutationVerdict::Fallback(self.mutated_text),
            (false, _, reason) => MutationVerdict::Rejected(reason.unwrap_or(RejectReason::Empty)),
        }
    }
}

/// What the mutate step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationVerdict {
    /// AI text passed the gate.
    Accepted(String),
    /// Fallback text passed the gate.
    Fallback(String),
    /// Nothing acceptable; the target is skipped.
    Rejected(RejectReason),
}

/// Quality gate bound to one target's length limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationGate {
    min_content_length: usize,
    max_content_length: usize,
    max_length_delta: f64,
}

impl MutationGate {
    pub fn new(min_content_length: usize, max_content_length: usize) -> Self {
        Self {
            min_content_length,
            max_content_length,
            max_length_delta: MAX_LENGTH_DELTA,
        }
    }

    pub fn for_target(target: &TargetConfig) -> Self {
        let (min, max) = target.length_bounds();
        Self::new(min, max)
    }

    /// Evaluate AI-produced text.
    pub fn evaluate(&self, original: &str, mutated: &str) -> MutationResult {
        self.check(original, mutated, false)
    }

    /// Evaluate text produced by the deterministic fallback.
    ///
    /// Identical text is tolerated here: the fallback is already a minimal
    /// deliberate change.
    pub fn evaluate_fallback(&self, original: &str, mutated: &str) -> MutationResult {
        self.check(original, mutated, true)
    }

    fn check(&self, original: &str, mutated: &str, fallback_applied: bool) -> MutationResult {
        let reject_reason = self.reject_reason(original, mutated, fallback_applied);
        MutationResult {
            original_text: original.to_string(),
            mutated_text: mutated.to_string(),
            accepted: reject_reason.is_none(),
            reject_reason,
            fallback_applied,
        }
    }

    fn reject_reason(&self, original: &str, mutated: &str, fallback_applied: bool) -> Option<RejectReason> {
        if mutated.trim().is_empty() {
            return Some(RejectReason::Empty);
        }

        let original_len = original.chars().count();
        let mutated_len = mutated.chars().count();

        let delta = original_len.abs_diff(mutated_len) as f64 / original_len.max(1) as f64;
        if delta > self.max_length_delta {
            return Some(RejectReason::LengthDelta);
        }

        if !fallback_applied && mutated == original {
            return Some(RejectReason::Identical);
        }

        if mutated_len < self.min_content_length || mutated_len > self.max_content_length {
            return Some(RejectReason::Truncated);
        }

        None
    }
}
