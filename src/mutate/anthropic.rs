//! Anthropic Messages API mutator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{MutationError, Mutator, build_prompt};
use crate::config::MutationConfig;
use crate::id::fingerprint;

/// Anthropic API base URL
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic mutator
#[derive(Debug, Clone)]
pub struct AnthropicMutatorConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub system_prompt: String,
    pub api_url: String,
}

impl Default for AnthropicMutatorConfig {
    fn default() -> Self {
        Self::from(&MutationConfig::default())
    }
}

impl From<&MutationConfig> for AnthropicMutatorConfig {
    fn from(config: &MutationConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_millis(config.timeout_ms),
            system_prompt: config.system_prompt.clone(),
            api_url: ANTHROPIC_API_URL.to_string(),
        }
    }
}

/// Mutator backed by the Anthropic Messages API
pub struct AnthropicMutator {
    client: Client,
    api_key: String,
    config: AnthropicMutatorConfig,
}

impl AnthropicMutator {
    /// Create a mutator reading the API key from `api_key_env`
    pub fn from_env(api_key_env: &str, config: AnthropicMutatorConfig) -> Result<Self, MutationError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| MutationError::NotConfigured(format!("{} not set", api_key_env)))?;
        Self::with_api_key(api_key, config)
    }

    /// Create a mutator with an explicit API key
    pub fn with_api_key(api_key: String, config: AnthropicMutatorConfig) -> Result<Self, MutationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MutationError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, api_key, config })
    }

    /// Build the request body for the Messages API
    fn build_request(&self, text: &str, context: &str) -> Value {
        json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": self.config.system_prompt,
            "messages": [
                {
                    "role": "user",
                    "content": build_prompt(text, context),
                }
            ]
        })
    }

    /// Extract the rewritten text from a Messages API response
    fn parse_response(body: &Value) -> Result<String, MutationError> {
        let text = body["content"]
            .as_array()
            .into_iter()
            .flatten()
            .filter(|block| block["type"].as_str() == Some("text"))
            .filter_map(|block| block["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let text = text.trim();
        if text.is_empty() {
            return Err(MutationError::InvalidResponse("no text content in response".to_string()));
        }
        Ok(text.to_string())
    }

    /// Send a request to the Anthropic API
    async fn send_request(&self, body: Value) -> Result<Value, MutationError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| MutationError::Network(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(MutationError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MutationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| MutationError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl Mutator for AnthropicMutator {
    async fn mutate(&self, text: &str, context: &str) -> Result<String, MutationError> {
        log::info!(
            "Requesting mutation for {} (len={}, fp={})",
            context,
            text.chars().count(),
            fingerprint(text)
        );
        let body = self.build_request(text, context);
        let response = self.send_request(body).await?;
        let mutated = Self::parse_response(&response)?;
        log::info!(
            "Mutation received for {} (len={}, fp={})",
            context,
            mutated.chars().count(),
            fingerprint(&mutated)
        );
        Ok(mutated)
    }
}

impl std::fmt::Debug for AnthropicMutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicMutator")
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}
