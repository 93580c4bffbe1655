//! Single entry point for a scheduled run.
//!
//! `invoke` builds the collaborators from configuration, runs every target,
//! notifies, and maps the result onto an exit code plus a JSON body.

use serde_json::json;
use std::sync::Arc;

use crate::config::{Config, SessionBackend};
use crate::domain::{OverallStatus, RunSummary};
use crate::error::FreshenError;
use crate::mutate::{AnthropicMutator, AnthropicMutatorConfig, Mutator, OfflineMutator};
use crate::notify::{FanoutSink, NotificationSink, should_notify};
use crate::orchestrator::{OrchestratorConfig, RefreshOrchestrator};
use crate::secrets::{CredentialProvider, EnvCredentialProvider, FileCredentialProvider};
use crate::session::{LocalSessionFactory, SessionFactory};

/// ALL_SUCCESS or PARTIAL_FAILURE
pub const EXIT_OK: i32 = 0;
/// ALL_FAILED
pub const EXIT_ALL_FAILED: i32 = 1;
/// The run could not be carried out at all
pub const EXIT_FAULT: i32 = 2;

/// What the caller of a run gets back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResponse {
    pub exit_code: i32,
    pub body: String,
}

impl RunResponse {
    /// Response for a finished run; the body is the serialized summary.
    pub fn from_summary(summary: &RunSummary) -> Self {
        match serde_json::to_string_pretty(summary) {
            Ok(body) => Self {
                exit_code: exit_code(summary.overall_status),
                body,
            },
            Err(e) => Self::fault(&FreshenError::Json(e)),
        }
    }

    /// Response for a run that never produced a summary.
    pub fn fault(error: &FreshenError) -> Self {
        let body = json!({
            "message": "Profile refresh failed",
            "error": error.to_string(),
        });
        Self {
            exit_code: EXIT_FAULT,
            body: body.to_string(),
        }
    }
}

/// Exit code for a finished run.
pub fn exit_code(status: OverallStatus) -> i32 {
    match status {
        OverallStatus::AllSuccess | OverallStatus::PartialFailure => EXIT_OK,
        OverallStatus::AllFailed => EXIT_ALL_FAILED,
    }
}

/// Collaborators for one run, chosen from configuration.
pub struct Collaborators {
    pub credentials: Arc<dyn CredentialProvider>,
    pub sessions: Arc<dyn SessionFactory>,
    pub mutator: Arc<dyn Mutator>,
    pub sink: Box<dyn NotificationSink>,
}

impl Collaborators {
    /// Build collaborators. `dry_run` forces the local session backend.
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self, FreshenError> {
        let credentials: Arc<dyn CredentialProvider> = match &config.secrets.path {
            Some(path) => {
                log::debug!("Using secrets file {}", path.display());
                Arc::new(FileCredentialProvider::new(path))
            }
            None => Arc::new(EnvCredentialProvider::from_env()),
        };

        let sessions = session_factory(config, dry_run)?;

        let mutator: Arc<dyn Mutator> = match AnthropicMutator::from_env(
            &config.mutation.api_key_env,
            AnthropicMutatorConfig::from(&config.mutation),
        ) {
            Ok(mutator) => Arc::new(mutator),
            Err(e) => {
                log::warn!("AI mutation disabled ({}), every target will use the fallback", e);
                Arc::new(OfflineMutator::new(e.to_string()))
            }
        };

        let sink = FanoutSink::from_config(&config.notifications)
            .map_err(|e| FreshenError::Config(format!("notifications: {}", e)))?;

        Ok(Self {
            credentials,
            sessions,
            mutator,
            sink: Box::new(sink),
        })
    }
}

fn session_factory(config: &Config, dry_run: bool) -> Result<Arc<dyn SessionFactory>, FreshenError> {
    if dry_run || config.session.backend == SessionBackend::Local {
        log::info!("Using local session backend at {}", config.session.local_dir.display());
        return Ok(Arc::new(LocalSessionFactory::new(&config.session.local_dir)));
    }

    #[cfg(feature = "browser")]
    {
        use crate::session::browser::{BrowserSessionFactory, BrowserSettings};
        Ok(Arc::new(BrowserSessionFactory::new(
            &config.targets,
            BrowserSettings::from(&config.session),
        )))
    }

    #[cfg(not(feature = "browser"))]
    {
        Err(FreshenError::Config(
            "session backend `browser` requires building with the `browser` feature".to_string(),
        ))
    }
}

/// Run every enabled target with collaborators built from `config`.
pub async fn invoke(config: &Config, dry_run: bool) -> RunResponse {
    match Collaborators::from_config(config, dry_run) {
        Ok(collaborators) => invoke_with(config, collaborators).await,
        Err(e) => {
            log::error!("Failed to set up run: {}", e);
            RunResponse::fault(&e)
        }
    }
}

/// Run every enabled target with the given collaborators.
pub async fn invoke_with(config: &Config, collaborators: Collaborators) -> RunResponse {
    let Collaborators {
        credentials,
        sessions,
        mutator,
        sink,
    } = collaborators;

    let orchestrator = RefreshOrchestrator::new(credentials, sessions, mutator, OrchestratorConfig::from(config));

    let summary = match orchestrator.run_all(&config.targets).await {
        Ok(summary) => summary,
        Err(e) => {
            log::error!("Refresh run aborted: {}", e);
            return RunResponse::fault(&e);
        }
    };

    if should_notify(&config.notifications, summary.overall_status) {
        if let Err(e) = sink.send(&summary).await {
            log::warn!("Notification failed: {}", e);
        }
    }

    RunResponse::from_summary(&summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;
    use crate::domain::{ErrorKind, TargetOutcome};

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(OverallStatus::AllSuccess), 0);
        assert_eq!(exit_code(OverallStatus::PartialFailure), 0);
        assert_eq!(exit_code(OverallStatus::AllFailed), 1);
    }

    #[test]
    fn test_fault_body() {
        let response = RunResponse::fault(&FreshenError::NoEnabledTargets);
        assert_eq!(response.exit_code, EXIT_FAULT);

        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["message"], "Profile refresh failed");
        assert_eq!(body["error"], "No enabled targets configured");
    }

    #[test]
    fn test_summary_body() {
        let mut run = RunSummary::start("run-x");
        run.push(TargetOutcome::failed("linkedin", ErrorKind::AuthFailure, "nope"));
        let response = RunResponse::from_summary(&run.finish());

        assert_eq!(response.exit_code, EXIT_ALL_FAILED);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["overall_status"], "ALL_FAILED");
        assert_eq!(body["outcomes"][0]["error_kind"], "AUTH_FAILURE");
    }

    #[tokio::test]
    async fn test_invoke_without_targets_is_a_fault() {
        let config = Config::default();
        let response = invoke(&config, true).await;
        assert_eq!(response.exit_code, EXIT_FAULT);
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn test_browser_backend_requires_feature() {
        let mut config = Config::default();
        config.session.backend = SessionBackend::Browser;
        config.targets.push(TargetConfig {
            id: "linkedin".to_string(),
            ..Default::default()
        });

        assert!(matches!(session_factory(&config, false), Err(FreshenError::Config(_))));
        assert!(session_factory(&config, true).is_ok());
    }
}
