//! Credential providers.
//!
//! The orchestrator asks for credentials lazily, one target at a time, right
//! before that target runs. Nothing is cached across fetches.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::Credentials;

/// The secret store could not produce credentials for a target.
#[derive(Debug, Error)]
pub enum SecretUnavailable {
    #[error("Secret store unreachable: {0}")]
    StoreUnreachable(String),

    #[error("No credentials for target: {0}")]
    MissingKey(String),

    #[error("Malformed secret store: {0}")]
    Malformed(String),
}

/// Source of per-target credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_credentials(&self, target_id: &str) -> Result<Credentials, SecretUnavailable>;
}

/// On-disk layout of a secrets file. Entries stay raw until one is asked for.
#[derive(Deserialize)]
struct SecretsFile {
    #[serde(default)]
    targets: HashMap<String, serde_json::Value>,
}

/// Reads a JSON secrets file on every fetch.
///
/// ```json
/// { "targets": { "linkedin": { "username": "me@example.com", "secret": "..." } } }
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialProvider {
    path: PathBuf,
}

impl FileCredentialProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialProvider for FileCredentialProvider {
    async fn get_credentials(&self, target_id: &str) -> Result<Credentials, SecretUnavailable> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SecretUnavailable::StoreUnreachable(format!("{}: {}", self.path.display(), e)))?;

        let mut file: SecretsFile =
            serde_json::from_str(&content).map_err(|e| SecretUnavailable::Malformed(e.to_string()))?;

        let entry = file
            .targets
            .remove(target_id)
            .ok_or_else(|| SecretUnavailable::MissingKey(target_id.to_string()))?;
        drop(file);

        let credentials: Credentials = serde_json::from_value(entry)
            .map_err(|e| SecretUnavailable::Malformed(format!("{}: {}", target_id, e)))?;

        log::debug!("Loaded credentials for {} ({})", target_id, credentials.masked_username());
        Ok(credentials)
    }
}

/// Reads `FRESHEN_<ID>_USERNAME` / `FRESHEN_<ID>_SECRET`.
///
/// The environment is captured at construction.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialProvider {
    vars: HashMap<String, String>,
}

impl EnvCredentialProvider {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            vars: vars.into_iter().filter(|(k, _)| k.starts_with("FRESHEN_")).collect(),
        }
    }

    /// Environment variable name for a target id and field.
    pub fn var_name(target_id: &str, field: &str) -> String {
        let id: String = target_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("FRESHEN_{}_{}", id, field)
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn get_credentials(&self, target_id: &str) -> Result<Credentials, SecretUnavailable> {
        let username = self.vars.get(&Self::var_name(target_id, "USERNAME"));
        let secret = self.vars.get(&Self::var_name(target_id, "SECRET"));
        match (username, secret) {
            (Some(username), Some(secret)) => Ok(Credentials::new(username.as_str(), secret.as_str())),
            _ => Err(SecretUnavailable::MissingKey(target_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_provider_reads_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(
            &path,
            r#"{"targets":{"linkedin":{"username":"me@example.com","secret":"pw1"},
                "naukri":{"username":"me","password":"pw2"}},
               "notification_email":"me@example.com"}"#,
        )
        .unwrap();

        let provider = FileCredentialProvider::new(&path);
        let linkedin = provider.get_credentials("linkedin").await.unwrap();
        assert_eq!(linkedin.username(), "me@example.com");
        assert_eq!(linkedin.secret(), "pw1");

        let naukri = provider.get_credentials("naukri").await.unwrap();
        assert_eq!(naukri.secret(), "pw2");
    }

    #[tokio::test]
    async fn test_file_provider_missing_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, r#"{"targets":{}}"#).unwrap();

        let err = FileCredentialProvider::new(&path).get_credentials("indeed").await.unwrap_err();
        assert!(matches!(err, SecretUnavailable::MissingKey(id) if id == "indeed"));
    }

    #[tokio::test]
    async fn test_file_provider_only_parses_requested_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(
            &path,
            r#"{"targets":{"linkedin":{"username":"me@example.com","secret":"pw1"},
                "indeed":{"username":42}}}"#,
        )
        .unwrap();

        let provider = FileCredentialProvider::new(&path);
        let linkedin = provider.get_credentials("linkedin").await.unwrap();
        assert_eq!(linkedin.secret(), "pw1");

        let err = provider.get_credentials("indeed").await.unwrap_err();
        assert!(matches!(err, SecretUnavailable::Malformed(msg) if msg.starts_with("indeed")));
    }

    #[tokio::test]
    async fn test_file_provider_missing_file() {
        let provider = FileCredentialProvider::new("/nonexistent/secrets.json");
        let err = provider.get_credentials("linkedin").await.unwrap_err();
        assert!(matches!(err, SecretUnavailable::StoreUnreachable(_)));
    }

    #[tokio::test]
    async fn test_file_provider_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileCredentialProvider::new(&path).get_credentials("linkedin").await.unwrap_err();
        assert!(matches!(err, SecretUnavailable::Malformed(_)));
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(EnvCredentialProvider::var_name("linkedin", "USERNAME"), "FRESHEN_LINKEDIN_USERNAME");
        assert_eq!(EnvCredentialProvider::var_name("job-board.v2", "SECRET"), "FRESHEN_JOB_BOARD_V2_SECRET");
    }

    #[tokio::test]
    async fn test_env_provider() {
        let provider = EnvCredentialProvider::from_vars(vec![
            ("FRESHEN_NAUKRI_USERNAME".to_string(), "me".to_string()),
            ("FRESHEN_NAUKRI_SECRET".to_string(), "pw".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);

        let creds = provider.get_credentials("naukri").await.unwrap();
        assert_eq!(creds.username(), "me");
        assert_eq!(creds.secret(), "pw");

        let err = provider.get_credentials("linkedin").await.unwrap_err();
        assert!(matches!(err, SecretUnavailable::MissingKey(_)));
    }
}
