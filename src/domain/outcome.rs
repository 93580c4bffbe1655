//! Per-target outcome types.
//!
//! Exactly one `TargetOutcome` is produced for every enabled target in a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Final status of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetStatus {
    Success,
    /// Intentionally not refreshed; not a failure.
    Skipped,
    Failed,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetStatus::Success => "SUCCESS",
            TargetStatus::Skipped => "SKIPPED",
            TargetStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Why a target did not simply succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AuthFailure,
    ContentReadFailure,
    MutationRejected,
    ContentWriteFailure,
    VerifyMismatch,
    CredentialsUnavailable,
    DeadlineExceeded,
    /// Mutation service down; the deterministic fallback was used.
    CollaboratorUnavailable,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::AuthFailure => "AUTH_FAILURE",
            ErrorKind::ContentReadFailure => "CONTENT_READ_FAILURE",
            ErrorKind::MutationRejected => "MUTATION_REJECTED",
            ErrorKind::ContentWriteFailure => "CONTENT_WRITE_FAILURE",
            ErrorKind::VerifyMismatch => "VERIFY_MISMATCH",
            ErrorKind::CredentialsUnavailable => "CREDENTIALS_UNAVAILABLE",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorKind::CollaboratorUnavailable => "COLLABORATOR_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runner state machine positions, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerStage {
    Init,
    LoggedIn,
    ContentRead,
    Mutated,
    Written,
    Verified,
}

/// Result of running one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target_id: String,
    pub status: TargetStatus,
    /// Session calls made against the target (login, reads, writes).
    pub attempts: u32,
    pub duration_ms: u64,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    /// Last state reached before the outcome was decided.
    pub stage: RunnerStage,
}

impl TargetOutcome {
    pub fn success(target_id: impl Into<String>, attempts: u32, duration_ms: u64) -> Self {
        Self {
            target_id: target_id.into(),
            status: TargetStatus::Success,
            attempts,
            duration_ms,
            error_kind: None,
            error_message: None,
            stage: RunnerStage::Verified,
        }
    }

    pub fn skipped(target_id: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            status: TargetStatus::Skipped,
            attempts: 0,
            duration_ms: 0,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            stage: RunnerStage::Init,
        }
    }

    pub fn failed(target_id: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            status: TargetStatus::Failed,
            attempts: 0,
            duration_ms: 0,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            stage: RunnerStage::Init,
        }
    }

    pub fn with_stage(mut self, stage: RunnerStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Record a non-fatal condition on an otherwise successful outcome.
    pub fn with_note(mut self, kind: ErrorKind, message: impl Into<String>) -> Self {
        self.error_kind = Some(kind);
        self.error_message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TargetStatus::Success
    }
}
