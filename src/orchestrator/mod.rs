//! Refresh orchestrator - runs every enabled target, one at a time.
//!
//! The orchestrator owns the collaborators and the run summary. Targets are
//! never run concurrently and one target's failure never stops the loop; only
//! a structurally invalid target list fails the whole call.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::{Config, TargetConfig, validate_targets};
use crate::domain::{ErrorKind, RunSummary, TargetOutcome};
use crate::error::Result;
use crate::id::generate_run_id;
use crate::mutate::Mutator;
use crate::retry::RetryPolicy;
use crate::runner::{TargetRunner, TargetRunnerConfig};
use crate::secrets::CredentialProvider;
use crate::session::SessionFactory;

/// Configuration for the RefreshOrchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Wall-clock budget for the run
    pub deadline: Option<Duration>,
    /// Minimum remaining budget needed to start a target
    pub min_target_budget: Duration,
    /// Pause between consecutive targets
    pub delay_between_targets: Duration,
    /// Per-target runner settings
    pub runner: TargetRunnerConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            deadline: config.execution.deadline(),
            min_target_budget: Duration::from_millis(config.execution.min_target_budget_ms),
            delay_between_targets: Duration::from_millis(config.execution.delay_between_targets_ms),
            runner: TargetRunnerConfig {
                policy: RetryPolicy::from(&config.retry),
                fallback_on_reject: config.mutation.fallback_on_reject,
            },
        }
    }
}

/// Remaining wall-clock budget for a run.
#[derive(Debug, Clone, Copy)]
struct RunDeadline {
    started: Instant,
    budget: Option<Duration>,
}

impl RunDeadline {
    fn start(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    fn remaining(&self) -> Option<Duration> {
        self.budget.map(|b| b.saturating_sub(self.started.elapsed()))
    }

    /// True when there is not enough budget left to start another target.
    /// A spent budget is exhausted whatever the minimum.
    fn exhausted(&self, min_budget: Duration) -> bool {
        self.remaining().is_some_and(|r| r.is_zero() || r < min_budget)
    }
}

/// RefreshOrchestrator drives a full run.
pub struct RefreshOrchestrator<C, F, M>
where
    C: CredentialProvider + ?Sized,
    F: SessionFactory + ?Sized,
    M: Mutator + ?Sized,
{
    credentials: Arc<C>,
    sessions: Arc<F>,
    runner: TargetRunner<M>,
    config: OrchestratorConfig,
}

impl<C, F, M> RefreshOrchestrator<C, F, M>
where
    C: CredentialProvider + ?Sized,
    F: SessionFactory + ?Sized,
    M: Mutator + ?Sized,
{
    /// Create a new RefreshOrchestrator.
    pub fn new(credentials: Arc<C>, sessions: Arc<F>, mutator: Arc<M>, config: OrchestratorConfig) -> Self {
        let runner = TargetRunner::with_config(mutator, config.runner.clone());
        Self {
            credentials,
            sessions,
            runner,
            config,
        }
    }

    /// Run every enabled target in order and summarize.
    ///
    /// Fails only if the target list is structurally invalid; every
    /// per-target problem becomes a `TargetOutcome`.
    pub async fn run_all(&self, targets: &[TargetConfig]) -> Result<RunSummary> {
        validate_targets(targets)?;

        let enabled: Vec<&TargetConfig> = targets.iter().filter(|t| t.enabled).collect();
        let run_id = generate_run_id();
        info!(run_id = %run_id, targets = enabled.len(), "Starting refresh run");

        let deadline = RunDeadline::start(self.config.deadline);
        let mut summary = RunSummary::start(run_id);

        for (index, target) in enabled.iter().enumerate() {
            if index > 0 && !self.config.delay_between_targets.is_zero() {
                tokio::time::sleep(self.config.delay_between_targets).await;
            }

            if deadline.exhausted(self.config.min_target_budget) {
                warn!(
                    remaining_ms = deadline.remaining().map(|r| r.as_millis() as u64),
                    skipped = enabled.len() - index,
                    "Run deadline reached, skipping remaining targets"
                );
                for skipped in &enabled[index..] {
                    summary.push(TargetOutcome::skipped(
                        &skipped.id,
                        ErrorKind::DeadlineExceeded,
                        "run deadline reached before target started",
                    ));
                }
                break;
            }

            let outcome = self.run_target(target).await;
            summary.push(outcome);
        }

        let summary = summary.finish();
        info!(
            run_id = %summary.run_id,
            status = %summary.overall_status,
            duration_ms = summary.total_duration_ms(),
            "Refresh run finished"
        );
        Ok(summary)
    }

    async fn run_target(&self, target: &TargetConfig) -> TargetOutcome {
        let credentials = match self.credentials.get_credentials(&target.id).await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(target_id = %target.id, error = %e, "Credentials unavailable");
                return TargetOutcome::failed(&target.id, ErrorKind::CredentialsUnavailable, e.to_string());
            }
        };

        let session = self.sessions.create(&target.id);
        self.runner.run(target, &credentials, session).await
    }
}
