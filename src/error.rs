//! Error types for Freshen
//!
//! Centralized error handling using thiserror. Collaborator-specific errors
//! (sessions, secrets, mutation, notification) live next to their traits;
//! this enum covers the conditions that fail a whole run.

use thiserror::Error;

/// All run-level error types that can occur in Freshen
#[derive(Debug, Error)]
pub enum FreshenError {
    /// Configuration is structurally invalid
    #[error("Config error: {0}")]
    Config(String),

    /// Nothing to do: every configured target is disabled or none exist
    #[error("No enabled targets configured")]
    NoEnabledTargets,

    /// Two targets share the same id
    #[error("Duplicate target id: {0}")]
    DuplicateTarget(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for Freshen operations
pub type Result<T> = std::result::Result<T, FreshenError>;
