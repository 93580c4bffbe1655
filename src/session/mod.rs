//! Target sessions: one authenticated automation context per target.
//!
//! The runner only sees the `TargetSession` trait. Each target gets a fresh
//! session from a `SessionFactory` and the runner closes it on every exit
//! path; sessions are never shared between targets.

pub mod local;

#[cfg(feature = "browser")]
pub mod browser;

#[cfg(test)]
pub(crate) mod testing;

pub use local::{LocalFieldSession, LocalSessionFactory};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::FieldSelector;
use crate::domain::Credentials;
use crate::retry::ErrorClass;

/// Classified session failures.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The target refused the credentials.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// CAPTCHA, 2FA prompt or other interactive verification.
    #[error("Interactive challenge detected: {0}")]
    Challenge(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The automation backend itself is broken.
    #[error("Browser error: {0}")]
    Browser(String),
}

impl SessionError {
    /// Map onto the retry policy's classes.
    pub fn class(&self) -> ErrorClass {
        match self {
            SessionError::InvalidCredentials(_) | SessionError::Challenge(_) => ErrorClass::Auth,
            SessionError::Timeout(_) | SessionError::ElementNotFound(_) | SessionError::Navigation(_) => {
                ErrorClass::TransientUi
            }
            SessionError::Browser(_) => ErrorClass::Fatal,
        }
    }
}

/// One authenticated automation context against one target.
#[async_trait]
pub trait TargetSession: Send {
    async fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError>;

    /// Current text of the field.
    async fn read_field(&mut self, selector: &FieldSelector) -> Result<String, SessionError>;

    /// Replace the field's text and persist it.
    async fn write_field(&mut self, selector: &FieldSelector, text: &str) -> Result<(), SessionError>;

    /// Release everything the session holds. Must be safe to call in any state.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Builds a fresh session for a target.
///
/// Construction is cheap and infallible; expensive setup (launching a
/// browser) happens in `login`, where its failure is classified.
pub trait SessionFactory: Send + Sync {
    fn create(&self, target_id: &str) -> Box<dyn TargetSession>;
}
