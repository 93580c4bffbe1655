//! Target runner - drives one target from login to verified write.
//!
//! State machine:
//! `Init → LoggedIn → ContentRead → Mutated → Written → Verified`, with
//! FAILED reachable from any state and SKIPPED from `Init` (disabled) or
//! `Mutated` (no acceptable text). The session is closed on every exit path
//! and a close failure never changes the outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{FieldSelector, TargetConfig};
use crate::domain::{Credentials, ErrorKind, RunnerStage, TargetOutcome, TargetStatus};
use crate::gate::{MutationGate, MutationVerdict, fallback_mutation};
use crate::id::fingerprint;
use crate::mutate::Mutator;
use crate::retry::RetryPolicy;
use crate::session::{SessionError, TargetSession};

/// Configuration for the TargetRunner.
#[derive(Debug, Clone)]
pub struct TargetRunnerConfig {
    /// Retry policy for reads and writes
    pub policy: RetryPolicy,
    /// Try the deterministic fallback when the AI text is rejected
    pub fallback_on_reject: bool,
}

impl Default for TargetRunnerConfig {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            fallback_on_reject: true,
        }
    }
}

/// Position, attempt count and elapsed time for one target.
#[derive(Debug)]
struct Progress {
    stage: RunnerStage,
    attempts: u32,
    elapsed: Duration,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: RunnerStage::Init,
            attempts: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn advance(&mut self, stage: RunnerStage) {
        self.stage = stage;
    }

    fn record(&mut self, started: Instant) {
        self.elapsed += started.elapsed();
    }
}

/// Why the run for a target stopped early.
#[derive(Debug)]
struct StepFailure {
    status: TargetStatus,
    kind: ErrorKind,
    message: String,
}

impl StepFailure {
    fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: TargetStatus::Failed,
            kind,
            message: message.into(),
        }
    }

    fn skipped(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: TargetStatus::Skipped,
            kind,
            message: message.into(),
        }
    }

    fn into_outcome(self, target_id: &str, credentials: &Credentials) -> TargetOutcome {
        let message = credentials.scrub(&self.message);
        match self.status {
            TargetStatus::Skipped => TargetOutcome::skipped(target_id, self.kind, message),
            _ => TargetOutcome::failed(target_id, self.kind, message),
        }
    }
}

/// Non-fatal condition carried on a successful outcome.
type Note = Option<(ErrorKind, String)>;

/// TargetRunner runs a single target end-to-end.
pub struct TargetRunner<M>
where
    M: Mutator + ?Sized,
{
    /// Mutation collaborator
    mutator: Arc<M>,
    /// Configuration
    config: TargetRunnerConfig,
}

impl<M> TargetRunner<M>
where
    M: Mutator + ?Sized,
{
    /// Create a new TargetRunner with default configuration.
    pub fn new(mutator: Arc<M>) -> Self {
        Self::with_config(mutator, TargetRunnerConfig::default())
    }

    /// Create a new TargetRunner with custom configuration.
    pub fn with_config(mutator: Arc<M>, config: TargetRunnerConfig) -> Self {
        Self { mutator, config }
    }

    /// Run one target and produce its outcome. Never fails.
    pub async fn run(
        &self,
        target: &TargetConfig,
        credentials: &Credentials,
        mut session: Box<dyn TargetSession>,
    ) -> TargetOutcome {
        if !target.enabled {
            if let Err(e) = session.close().await {
                warn!(target_id = %target.id, error = %e, "Session cleanup failed");
            }
            return TargetOutcome {
                target_id: target.id.clone(),
                status: TargetStatus::Skipped,
                attempts: 0,
                duration_ms: 0,
                error_kind: None,
                error_message: Some("target disabled".to_string()),
                stage: RunnerStage::Init,
            };
        }

        let mut progress = Progress::new();
        info!(target_id = %target.id, user = %credentials.masked_username(), "Starting target");
        let result = self.drive(target, credentials, session.as_mut(), &mut progress).await;

        let started = Instant::now();
        if let Err(e) = session.close().await {
            warn!(target_id = %target.id, error = %credentials.scrub(&e.to_string()), "Session cleanup failed");
        }
        progress.record(started);

        let duration_ms = progress.elapsed.as_millis() as u64;
        let outcome = match result {
            Ok(note) => {
                let outcome = TargetOutcome::success(&target.id, progress.attempts, duration_ms);
                match note {
                    Some((kind, message)) => outcome.with_note(kind, credentials.scrub(&message)),
                    None => outcome,
                }
            }
            Err(failure) => failure
                .into_outcome(&target.id, credentials)
                .with_stage(progress.stage)
                .with_attempts(progress.attempts)
                .with_duration_ms(duration_ms),
        };

        info!(
            target_id = %outcome.target_id,
            status = %outcome.status,
            attempts = outcome.attempts,
            duration_ms = outcome.duration_ms,
            "Target finished"
        );
        outcome
    }

    async fn drive(
        &self,
        target: &TargetConfig,
        credentials: &Credentials,
        session: &mut dyn TargetSession,
        progress: &mut Progress,
    ) -> Result<Note, StepFailure> {
        // Login: never retried within a run
        let started = Instant::now();
        progress.attempts += 1;
        let login = session.login(credentials).await;
        progress.record(started);
        if let Err(e) = login {
            warn!(target_id = %target.id, class = ?e.class(), "Login failed");
            return Err(StepFailure::failed(ErrorKind::AuthFailure, e.to_string()));
        }
        progress.advance(RunnerStage::LoggedIn);

        // Read
        let original = self
            .read_with_retry(&target.id, session, &target.field, progress)
            .await
            .map_err(|e| StepFailure::failed(ErrorKind::ContentReadFailure, e.to_string()))?;
        progress.advance(RunnerStage::ContentRead);
        debug!(
            target_id = %target.id,
            len = original.chars().count(),
            fp = %fingerprint(&original),
            "Read current content"
        );

        // Mutate + gate
        let started = Instant::now();
        let (verdict, note) = self.mutate(target, &original).await;
        progress.record(started);
        progress.advance(RunnerStage::Mutated);
        let mutated = match verdict {
            MutationVerdict::Accepted(text) | MutationVerdict::Fallback(text) => text,
            MutationVerdict::Rejected(reason) => {
                let mut message = format!("mutation rejected ({})", reason);
                if let Some((_, cause)) = &note {
                    message.push_str(&format!("; mutation service unavailable: {}", cause));
                }
                return Err(StepFailure::skipped(ErrorKind::MutationRejected, message));
            }
        };

        // Write
        self.write_with_retry(&target.id, session, &target.field, &mutated, progress)
            .await
            .map_err(|e| StepFailure::failed(ErrorKind::ContentWriteFailure, e.to_string()))?;
        progress.advance(RunnerStage::Written);

        // Verify: a mismatch is reported, never re-written
        let observed = self
            .read_with_retry(&target.id, session, &target.field, progress)
            .await
            .map_err(|e| StepFailure::failed(ErrorKind::ContentReadFailure, format!("verify read: {}", e)))?;
        if observed.trim() != mutated.trim() {
            return Err(StepFailure::failed(
                ErrorKind::VerifyMismatch,
                format!(
                    "field shows {} chars (fp {}), expected {} chars (fp {})",
                    observed.trim().chars().count(),
                    fingerprint(observed.trim()),
                    mutated.trim().chars().count(),
                    fingerprint(mutated.trim())
                ),
            ));
        }
        progress.advance(RunnerStage::Verified);

        Ok(note)
    }

    /// Ask the mutator, gate the answer, fall back when needed.
    async fn mutate(&self, target: &TargetConfig, original: &str) -> (MutationVerdict, Note) {
        let gate = MutationGate::for_target(target);

        match self.mutator.mutate(original, &target.id).await {
            Ok(text) => {
                let result = gate.evaluate(original, text.trim());
                if result.accepted {
                    return (result.into_verdict(), None);
                }
                warn!(target_id = %target.id, reason = ?result.reject_reason, "Mutation rejected by gate");
                if !self.config.fallback_on_reject {
                    return (result.into_verdict(), None);
                }
            }
            Err(e) => {
                warn!(target_id = %target.id, error = %e, "Mutation service unavailable, using fallback");
                let verdict = self.fallback(&gate, target, original);
                return (verdict, Some((ErrorKind::CollaboratorUnavailable, e.to_string())));
            }
        }

        (self.fallback(&gate, target, original), None)
    }

    fn fallback(&self, gate: &MutationGate, target: &TargetConfig, original: &str) -> MutationVerdict {
        let candidate = fallback_mutation(original);
        let verdict = gate.evaluate_fallback(original, &candidate).into_verdict();
        if let MutationVerdict::Rejected(reason) = &verdict {
            warn!(target_id = %target.id, reason = %reason, "Fallback mutation rejected");
        }
        verdict
    }

    async fn read_with_retry(
        &self,
        target_id: &str,
        session: &mut dyn TargetSession,
        selector: &FieldSelector,
        progress: &mut Progress,
    ) -> Result<String, SessionError> {
        let started = Instant::now();
        let mut attempt = 1;
        let result = loop {
            progress.attempts += 1;
            match session.read_field(selector).await {
                Ok(text) => break Ok(text),
                Err(e) => {
                    let decision = self.config.policy.should_retry(attempt, e.class());
                    if !decision.retry {
                        break Err(e);
                    }
                    warn!(
                        target_id = %target_id,
                        attempt,
                        backoff_ms = decision.backoff_ms(),
                        error = %e,
                        "Read failed, retrying"
                    );
                    tokio::time::sleep(decision.backoff).await;
                    attempt += 1;
                }
            }
        };
        progress.record(started);
        result
    }

    async fn write_with_retry(
        &self,
        target_id: &str,
        session: &mut dyn TargetSession,
        selector: &FieldSelector,
        text: &str,
        progress: &mut Progress,
    ) -> Result<(), SessionError> {
        let started = Instant::now();
        let mut attempt = 1;
        let result = loop {
            progress.attempts += 1;
            match session.write_field(selector, text).await {
                Ok(()) => break Ok(()),
                Err(e) => {
                    let decision = self.config.policy.should_retry(attempt, e.class());
                    if !decision.retry {
                        break Err(e);
                    }
                    warn!(
                        target_id = %target_id,
                        attempt,
                        backoff_ms = decision.backoff_ms(),
                        error = %e,
                        "Write failed, retrying"
                    );
                    tokio::time::sleep(decision.backoff).await;
                    attempt += 1;
                }
            }
        };
        progress.record(started);
        result
    }
}
