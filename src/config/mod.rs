//! Configuration system for Freshen.
//!
//! One YAML file carries run-wide settings plus the ordered target list.

pub use self::global::{
    Config, ExecutionConfig, MutationConfig, NotificationConfig, RetryConfig, SecretsConfig, SessionBackend,
    SessionConfig, validate_targets,
};
pub use self::target::{FieldSelector, LoginSelectors, TargetConfig};

mod global;
mod target;

/// Default mutation model.
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Default system prompt for the mutation model.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional profile editor. Your task is to make minimal, \
subtle changes to profile text to keep it fresh while preserving the original meaning and intent.";
