//! Global configuration.
//!
//! Loaded from ~/.config/freshen/freshen.yml or ./freshen.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::target::TargetConfig;
use crate::error::FreshenError;

/// Global configuration for Freshen.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Log level used when RUST_LOG is not set.
    pub log_level: String,

    /// Retry settings for transient UI failures.
    pub retry: RetryConfig,

    /// Run-wide pacing and deadline.
    pub execution: ExecutionConfig,

    /// AI mutation settings.
    pub mutation: MutationConfig,

    /// Where credentials come from.
    pub secrets: SecretsConfig,

    /// Session backend settings.
    pub session: SessionConfig,

    /// Notification settings.
    pub notifications: NotificationConfig,

    /// Refresh targets, processed in order.
    pub targets: Vec<TargetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            retry: RetryConfig::default(),
            execution: ExecutionConfig::default(),
            mutation: MutationConfig::default(),
            secrets: SecretsConfig::default(),
            session: SessionConfig::default(),
            notifications: NotificationConfig::default(),
            targets: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. ~/.config/freshen/freshen.yml
    /// 3. ./freshen.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try project config
        let project_config = PathBuf::from(format!("{}.yml", project_name));
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", project_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub(crate) fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

}

/// Structural validation of a target list.
///
/// Fails on: no enabled targets, empty or duplicate ids, inverted length bounds.
pub fn validate_targets(targets: &[TargetConfig]) -> crate::error::Result<()> {
    let mut seen = HashSet::new();
    for target in targets {
        if target.id.trim().is_empty() {
            return Err(FreshenError::Config("target id must not be empty".to_string()));
        }
        if !seen.insert(target.id.as_str()) {
            return Err(FreshenError::DuplicateTarget(target.id.clone()));
        }
        if target.min_content_length > target.max_content_length {
            return Err(FreshenError::Config(format!(
                "target {}: min-content-length ({}) exceeds max-content-length ({})",
                target.id, target.min_content_length, target.max_content_length
            )));
        }
        if target.field.field.trim().is_empty() {
            return Err(FreshenError::Config(format!("target {}: field selector is empty", target.id)));
        }
    }

    if !targets.iter().any(|t| t.enabled) {
        return Err(FreshenError::NoEnabledTargets);
    }
    Ok(())
}

/// Retry settings for transient UI failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Linear backoff unit; retry N waits N * base.
    pub base_delay_ms: u64,

    /// Total attempts including the first one.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_attempts: 3,
        }
    }
}

/// Run-wide pacing and deadline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExecutionConfig {
    /// Wall-clock budget for the whole run. None disables the deadline.
    pub deadline_ms: Option<u64>,

    /// A target only starts if at least this much budget remains.
    pub min_target_budget_ms: u64,

    /// Pause between consecutive targets.
    pub delay_between_targets_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            deadline_ms: Some(270_000), // 4.5 minutes
            min_target_budget_ms: 30_000,
            delay_between_targets_ms: 5_000,
        }
    }
}

impl ExecutionConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// AI mutation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MutationConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_ms: u64,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// System prompt sent with every mutation request.
    pub system_prompt: String,

    /// Apply the deterministic fallback when the AI text is rejected by the gate.
    pub fallback_on_reject: bool,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            model: super::DEFAULT_MODEL.to_string(),
            max_tokens: 500,
            temperature: 0.7,
            timeout_ms: 60_000,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            system_prompt: super::DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_on_reject: true,
        }
    }
}

/// Where credentials come from.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SecretsConfig {
    /// JSON secrets file. When unset, credentials come from FRESHEN_<ID>_* env vars.
    pub path: Option<PathBuf>,
}

/// Which session backend drives the targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Fields are local files; nothing leaves the machine.
    #[default]
    Local,
    /// Headless Chromium over CDP (requires the `browser` feature).
    Browser,
}

/// Session backend settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub headless: bool,

    /// Upper bound for a single page interaction.
    pub timeout_ms: u64,

    /// Pause between UI actions.
    pub action_delay_ms: u64,

    /// Directory backing the local backend.
    pub local_dir: PathBuf,

    /// Where the browser backend saves a page screenshot when a step fails.
    /// `~` turns capture off.
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Local,
            headless: true,
            timeout_ms: 30_000,
            action_delay_ms: 100,
            local_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("freshen")
                .join("fields"),
            screenshot_dir: Some(std::env::temp_dir().join("freshen-screenshots")),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NotificationConfig {
    /// POST the summary here when set.
    pub webhook_url: Option<String>,
    pub send_on_success: bool,
    pub send_on_failure: bool,
    pub timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            send_on_success: true,
            send_on_failure: true,
            timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::target::FieldSelector;

    fn target(id: &str, enabled: bool) -> TargetConfig {
        TargetConfig {
            id: id.to_string(),
            enabled,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.execution.deadline(), Some(Duration::from_millis(270_000)));
        assert_eq!(config.session.backend, SessionBackend::Local);
        assert!(config.session.screenshot_dir.is_some());
        assert!(config.mutation.fallback_on_reject);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r##"
log-level: debug
retry:
  base-delay-ms: 250
execution:
  deadline-ms: ~
  delay-between-targets-ms: 0
session:
  backend: browser
  screenshot-dir: ~
notifications:
  webhook-url: https://hooks.example.com/freshen
  send-on-success: false
targets:
  - id: linkedin
    field:
      page-url: https://www.linkedin.com/in/me
      field: "#about textarea"
      save: "button[type=submit]"
    max-content-length: 2600
  - id: indeed
    enabled: false
    field:
      field: "#summary"
"##;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.retry.base_delay_ms, 250);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.execution.deadline(), None);
        assert_eq!(config.session.backend, SessionBackend::Browser);
        assert!(config.session.screenshot_dir.is_none());
        assert!(!config.notifications.send_on_success);
        assert!(config.notifications.send_on_failure);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].max_content_length, 2600);
        assert_eq!(config.targets[0].min_content_length, 1);
        assert!(config.targets[0].enabled);
        assert!(!config.targets[1].enabled);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("freshen.yml");
        fs::write(&path, "targets:\n  - id: naukri\n    field:\n      field: textarea\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].id, "naukri");
    }

    #[test]
    fn test_load_explicit_path_missing_fails() {
        let missing = PathBuf::from("/nonexistent/freshen.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_validate_targets_ok() {
        let targets = vec![target("a", true), target("b", false)];
        assert!(validate_targets(&targets).is_ok());
    }

    #[test]
    fn test_validate_targets_empty() {
        assert!(matches!(validate_targets(&[]), Err(FreshenError::NoEnabledTargets)));
    }

    #[test]
    fn test_validate_targets_all_disabled() {
        let targets = vec![target("a", false)];
        assert!(matches!(validate_targets(&targets), Err(FreshenError::NoEnabledTargets)));
    }

    #[test]
    fn test_validate_targets_duplicate() {
        let targets = vec![target("a", true), target("a", false)];
        assert!(matches!(validate_targets(&targets), Err(FreshenError::DuplicateTarget(id)) if id == "a"));
    }

    #[test]
    fn test_validate_targets_inverted_bounds() {
        let mut t = target("a", true);
        t.min_content_length = 50;
        t.max_content_length = 10;
        assert!(matches!(validate_targets(&[t]), Err(FreshenError::Config(_))));
    }

    #[test]
    fn test_validate_targets_empty_selector() {
        let mut t = target("a", true);
        t.field = FieldSelector {
            field: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(validate_targets(&[t]), Err(FreshenError::Config(_))));
    }
}
