//! Text mutation collaborators.
//!
//! A mutator rewrites profile text with a minimal, meaning-preserving edit.
//! Any failure here is treated as "collaborator unavailable" by the runner,
//! which then falls back to the deterministic mutation in `gate`.

pub mod anthropic;

pub use anthropic::{AnthropicMutator, AnthropicMutatorConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Why a mutation call produced no text.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Mutation service not configured: {0}")]
    NotConfigured(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Rewrites text. `context` identifies what the text is (the target id).
#[async_trait]
pub trait Mutator: Send + Sync {
    async fn mutate(&self, text: &str, context: &str) -> Result<String, MutationError>;
}

/// Mutator used when no mutation service is configured.
///
/// Always unavailable, so every target takes the fallback path.
#[derive(Debug, Clone, Default)]
pub struct OfflineMutator {
    reason: String,
}

impl OfflineMutator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl Mutator for OfflineMutator {
    async fn mutate(&self, _text: &str, _context: &str) -> Result<String, MutationError> {
        Err(MutationError::NotConfigured(self.reason.clone()))
    }
}

/// Build the user prompt for a minimal-edit request.
pub fn build_prompt(text: &str, context: &str) -> String {
    let context_line = if context.is_empty() {
        String::new()
    } else {
        format!("Context: This is the {} section of a professional profile.\n\n", context)
    };

    format!(
        "{}Original text:\n{}\n\n\
Task: Make MINIMAL changes to refresh this text while preserving its exact meaning and professional tone. \
Changes should be subtle and natural, such as:\n\
- Rearranging sentence structure slightly\n\
- Replacing a few words with synonyms\n\
- Adjusting punctuation or formatting\n\
- DO NOT add new information or change the core message\n\
- DO NOT make it longer or shorter by more than 10%\n\
- Keep the same professional level and tone\n\n\
Provide ONLY the modified text, no explanations or preamble.",
        context_line, text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_mutator_always_fails() {
        let mutator = OfflineMutator::new("ANTHROPIC_API_KEY not set");
        let err = mutator.mutate("text", "linkedin").await.unwrap_err();
        assert!(matches!(err, MutationError::NotConfigured(_)));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_build_prompt_with_context() {
        let prompt = build_prompt("I ship software.", "linkedin");
        assert!(prompt.starts_with("Context: This is the linkedin section"));
        assert!(prompt.contains("Original text:\nI ship software.\n"));
        assert!(prompt.ends_with("no explanations or preamble."));
    }

    #[test]
    fn test_build_prompt_without_context() {
        let prompt = build_prompt("I ship software.", "");
        assert!(prompt.starts_with("Original text:"));
    }

    #[test]
    fn test_error_display() {
        let err = MutationError::Api {
            status: 529,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error 529: overloaded");
    }
}
