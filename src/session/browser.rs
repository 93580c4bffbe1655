//! Headless Chromium session over CDP (chromiumoxide).
//!
//! Only compiled with the `browser` feature. The browser is launched lazily
//! in `login` so that a launch failure is classified like any other login
//! failure, and torn down in `close`. When a login, read or write fails the
//! current page is saved as a PNG under the configured screenshot directory.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{SessionError, SessionFactory, TargetSession};
use crate::config::{FieldSelector, LoginSelectors, SessionConfig, TargetConfig};
use crate::domain::Credentials;
use crate::id::now_ms;

/// Selectors commonly used for inline login errors.
const LOGIN_ERROR_SELECTORS: &[&str] = &["[role=\"alert\"]", ".error-message", ".alert-danger", "[data-test=\"error\"]"];

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Settings shared by every browser session in a run.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub timeout: Duration,
    pub action_delay: Duration,
    pub screenshot_dir: Option<PathBuf>,
}

impl From<&SessionConfig> for BrowserSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            headless: config.headless,
            timeout: Duration::from_millis(config.timeout_ms),
            action_delay: Duration::from_millis(config.action_delay_ms),
            screenshot_dir: config.screenshot_dir.clone(),
        }
    }
}

/// `<dir>/<target>-<step>-<ms>.png`
fn screenshot_path(dir: &Path, target_id: &str, step: &str, at_ms: u64) -> PathBuf {
    dir.join(format!("{}-{}-{}.png", target_id, step, at_ms))
}

struct Running {
    browser: Browser,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
}

/// One Chromium instance driving one target.
pub struct BrowserSession {
    target_id: String,
    login: Option<LoginSelectors>,
    settings: BrowserSettings,
    running: Option<Running>,
}

impl BrowserSession {
    pub fn new(target_id: impl Into<String>, login: Option<LoginSelectors>, settings: BrowserSettings) -> Self {
        Self {
            target_id: target_id.into(),
            login,
            settings,
            running: None,
        }
    }

    async fn launch(&mut self, url: &str) -> Result<&Page, SessionError> {
        let mut builder = BrowserConfig::builder().request_timeout(self.settings.timeout);
        if !self.settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(SessionError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SessionError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {
                // Drain CDP events; the browser stalls otherwise
            }
        });

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| SessionError::Navigation(format!("{}: {}", url, e)))?;

        self.running = Some(Running { browser, page, handler });
        self.page()
    }

    fn page(&self) -> Result<&Page, SessionError> {
        self.running
            .as_ref()
            .map(|r| &r.page)
            .ok_or_else(|| SessionError::Navigation("browser not started".to_string()))
    }

    async fn pause(&self) {
        tokio::time::sleep(self.settings.action_delay).await;
    }

    async fn wait_for(&self, selector: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        let deadline = Instant::now() + self.settings.timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout(format!("waiting for {}", selector)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        self.wait_for(selector).await?;
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|_| SessionError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| SessionError::Navigation(format!("click {}: {}", selector, e)))?;
        self.pause().await;
        Ok(())
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), SessionError> {
        self.wait_for(selector).await?;
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|_| SessionError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| SessionError::Navigation(format!("focus {}: {}", selector, e)))?;
        element
            .type_str(text)
            .await
            .map_err(|e| SessionError::Navigation(format!("type into {}: {}", selector, e)))?;
        self.pause().await;
        Ok(())
    }

    /// First visible inline login error, if any.
    async fn login_error(&self) -> Option<String> {
        let page = self.page().ok()?;
        for selector in LOGIN_ERROR_SELECTORS {
            if let Ok(element) = page.find_element(*selector).await {
                if let Ok(Some(text)) = element.inner_text().await {
                    let text = text.trim();
                    if !text.is_empty() {
                        return Some(text.to_string());
                    }
                }
            }
        }
        None
    }

    /// Save the current page for later inspection. Failures are only logged.
    async fn capture(&self, step: &str) {
        let Some(dir) = &self.settings.screenshot_dir else {
            return;
        };
        let Ok(page) = self.page() else {
            return;
        };
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            log::warn!("Cannot create screenshot directory {}: {}", dir.display(), e);
            return;
        }

        let path = screenshot_path(dir, &self.target_id, step, now_ms());
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        match page.save_screenshot(params, &path).await {
            Ok(_) => log::debug!("Screenshot saved: {}", path.display()),
            Err(e) => log::warn!("Screenshot for {} failed: {}", self.target_id, e),
        }
    }

    async fn sign_in(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        let login = self
            .login
            .clone()
            .ok_or_else(|| SessionError::InvalidCredentials(format!("no login selectors for {}", self.target_id)))?;

        self.launch(&login.url).await?;
        self.pause().await;

        self.type_into(&login.username, credentials.username()).await?;
        self.type_into(&login.password, credentials.secret()).await?;
        self.click(&login.submit).await?;

        match self.wait_for(&login.success).await {
            Ok(()) => {
                log::info!("Login succeeded for {}", self.target_id);
                Ok(())
            }
            Err(_) => match self.login_error().await {
                Some(message) => Err(SessionError::InvalidCredentials(message)),
                None => Err(SessionError::Challenge(
                    "login verification required or CAPTCHA detected".to_string(),
                )),
            },
        }
    }

    async fn read_current(&self, selector: &FieldSelector) -> Result<String, SessionError> {
        self.open_field(selector).await?;
        match self.field_value(&selector.field).await? {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(SessionError::ElementNotFound(format!("{} is empty or missing", selector.field))),
        }
    }

    async fn replace_text(&self, selector: &FieldSelector, text: &str) -> Result<(), SessionError> {
        self.open_field(selector).await?;
        self.clear_field(&selector.field).await?;
        self.pause().await;
        self.type_into(&selector.field, text).await?;
        if let Some(save) = &selector.save {
            self.click(save).await?;
        }
        // Give the page time to persist before the verify read
        tokio::time::sleep(self.settings.action_delay * 10).await;
        Ok(())
    }

    async fn open_field(&self, selector: &FieldSelector) -> Result<(), SessionError> {
        if let Some(url) = &selector.page_url {
            self.page()?
                .goto(url.as_str())
                .await
                .map_err(|e| SessionError::Navigation(format!("{}: {}", url, e)))?;
            self.pause().await;
        }
        if let Some(edit) = &selector.edit {
            self.click(edit).await?;
        }
        self.wait_for(&selector.field).await
    }

    async fn field_value(&self, field: &str) -> Result<Option<String>, SessionError> {
        let js_selector = serde_json::to_string(field).map_err(|e| SessionError::Browser(e.to_string()))?;
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return null; \
             return ('value' in el) ? el.value : el.innerText; }})()",
            js_selector
        );
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| SessionError::Navigation(format!("read {}: {}", field, e)))?
            .into_value::<Option<String>>()
            .map_err(|e| SessionError::Browser(e.to_string()))
    }

    async fn clear_field(&self, field: &str) -> Result<(), SessionError> {
        let js_selector = serde_json::to_string(field).map_err(|e| SessionError::Browser(e.to_string()))?;
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return false; \
             if ('value' in el) {{ el.value = ''; }} else {{ el.innerText = ''; }} \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             return true; }})()",
            js_selector
        );
        let cleared = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| SessionError::Navigation(format!("clear {}: {}", field, e)))?
            .into_value::<bool>()
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        if cleared {
            Ok(())
        } else {
            Err(SessionError::ElementNotFound(field.to_string()))
        }
    }
}

#[async_trait]
impl TargetSession for BrowserSession {
    async fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        let result = self.sign_in(credentials).await;
        if result.is_err() {
            self.capture("login").await;
        }
        result
    }

    async fn read_field(&mut self, selector: &FieldSelector) -> Result<String, SessionError> {
        let result = self.read_current(selector).await;
        if result.is_err() {
            self.capture("read").await;
        }
        result
    }

    async fn write_field(&mut self, selector: &FieldSelector, text: &str) -> Result<(), SessionError> {
        let result = self.replace_text(selector, text).await;
        if result.is_err() {
            self.capture("write").await;
        }
        result
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };
        let result = running
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Browser(format!("close failed: {}", e)));
        let _ = running.browser.wait().await;
        running.handler.abort();
        result
    }
}

/// Builds `BrowserSession`s from the configured targets.
pub struct BrowserSessionFactory {
    logins: HashMap<String, LoginSelectors>,
    settings: BrowserSettings,
}

impl BrowserSessionFactory {
    pub fn new(targets: &[TargetConfig], settings: BrowserSettings) -> Self {
        let logins = targets
            .iter()
            .filter_map(|t| t.login.clone().map(|login| (t.id.clone(), login)))
            .collect();
        Self { logins, settings }
    }
}

impl SessionFactory for BrowserSessionFactory {
    fn create(&self, target_id: &str) -> Box<dyn TargetSession> {
        Box::new(BrowserSession::new(
            target_id,
            self.logins.get(target_id).cloned(),
            self.settings.clone(),
        ))
    }
}
