//! File-backed session for dry runs.
//!
//! Each target's field is a file `<dir>/<target_id>.txt`. Nothing leaves the
//! machine, which makes this backend useful for rehearsing a configuration
//! and for exercising the full pipeline in tests.

use async_trait::async_trait;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use super::{SessionError, SessionFactory, TargetSession};
use crate::config::FieldSelector;
use crate::domain::Credentials;

/// Session whose field is a local text file.
#[derive(Debug)]
pub struct LocalFieldSession {
    path: PathBuf,
    logged_in: bool,
}

impl LocalFieldSession {
    pub fn new(dir: &Path, target_id: &str) -> Self {
        Self {
            path: dir.join(format!("{}.txt", target_id)),
            logged_in: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_logged_in(&self) -> Result<(), SessionError> {
        if self.logged_in {
            Ok(())
        } else {
            Err(SessionError::Navigation("not logged in".to_string()))
        }
    }
}

#[async_trait]
impl TargetSession for LocalFieldSession {
    async fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        if credentials.is_incomplete() {
            return Err(SessionError::InvalidCredentials("username and secret are required".to_string()));
        }
        self.logged_in = true;
        log::debug!("Local session opened for {}", self.path.display());
        Ok(())
    }

    async fn read_field(&mut self, selector: &FieldSelector) -> Result<String, SessionError> {
        self.ensure_logged_in()?;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Err(SessionError::ElementNotFound(selector.field.clone())),
            Err(e) => Err(SessionError::Navigation(e.to_string())),
        }
    }

    async fn write_field(&mut self, _selector: &FieldSelector, text: &str) -> Result<(), SessionError> {
        self.ensure_logged_in()?;
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| SessionError::Navigation(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.logged_in = false;
        Ok(())
    }
}

/// Factory for `LocalFieldSession`s rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalSessionFactory {
    dir: PathBuf,
}

impl LocalSessionFactory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SessionFactory for LocalSessionFactory {
    fn create(&self, target_id: &str) -> Box<dyn TargetSession> {
        Box::new(LocalFieldSession::new(&self.dir, target_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn creds() -> Credentials {
        Credentials::new("user", "pw")
    }

    #[tokio::test]
    async fn test_read_write_roundtrip() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("linkedin.txt"), "Original about text.\n").unwrap();

        let mut session = LocalFieldSession::new(dir.path(), "linkedin");
        session.login(&creds()).await.unwrap();

        let selector = FieldSelector::default();
        assert_eq!(session.read_field(&selector).await.unwrap(), "Original about text.");

        session.write_field(&selector, "Original about text").await.unwrap();
        assert_eq!(session.read_field(&selector).await.unwrap(), "Original about text");
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_element_not_found() {
        let dir = TempDir::new().unwrap();
        let mut session = LocalFieldSession::new(dir.path(), "ghost");
        session.login(&creds()).await.unwrap();

        let err = session.read_field(&FieldSelector::default()).await.unwrap_err();
        assert!(matches!(err, SessionError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn test_incomplete_credentials_rejected() {
        let dir = TempDir::new().unwrap();
        let mut session = LocalFieldSession::new(dir.path(), "t");
        let err = session.login(&Credentials::new("user", "")).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn test_read_requires_login() {
        let dir = TempDir::new().unwrap();
        let mut session = LocalFieldSession::new(dir.path(), "t");
        assert!(session.read_field(&FieldSelector::default()).await.is_err());
    }

    #[test]
    fn test_factory_paths() {
        let factory = LocalSessionFactory::new("/tmp/fields");
        let _session = factory.create("naukri");
        let session = LocalFieldSession::new(Path::new("/tmp/fields"), "naukri");
        assert_eq!(session.path(), Path::new("/tmp/fields/naukri.txt"));
    }
}
