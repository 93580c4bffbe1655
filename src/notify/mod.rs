//! Run notifications.
//!
//! A sink receives the finished summary exactly once per run. Delivery is
//! best-effort: the caller logs a failure and moves on, the summary is never
//! touched and nothing is retried.

mod report;

pub use report::{render_subject, render_text};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::config::NotificationConfig;
use crate::domain::{OverallStatus, RunSummary};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Transport(String),

    #[error("Webhook rejected notification: HTTP {0}")]
    Rejected(u16),

    #[error("{failed} of {total} sinks failed")]
    Partial { failed: usize, total: usize },
}

/// Receives the final run summary.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, summary: &RunSummary) -> Result<(), NotifyError>;
}

/// Writes the text report to the log.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        let subject = render_subject(summary);
        let text = render_text(summary);
        match summary.overall_status {
            OverallStatus::AllSuccess => log::info!("{}\n{}", subject, text),
            _ => log::warn!("{}\n{}", subject, text),
        }
        Ok(())
    }
}

/// POSTs `{ subject, text, summary }` as JSON.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        let body = json!({
            "subject": render_subject(summary),
            "text": render_text(summary),
            "summary": summary,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        log::info!("Notification delivered to webhook (HTTP {})", status.as_u16());
        Ok(())
    }
}

/// Sends to every sink; reports how many failed.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Log sink plus a webhook sink when one is configured.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let mut fanout = Self::new().with(Box::new(LogSink));
        if let Some(url) = config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
            let webhook = WebhookSink::new(url, Duration::from_millis(config.timeout_ms))?;
            fanout = fanout.with(Box::new(webhook));
        }
        Ok(fanout)
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn send(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        let mut failed = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.send(summary).await {
                log::warn!("Notification sink failed: {}", e);
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(NotifyError::Partial {
                failed,
                total: self.sinks.len(),
            });
        }
        Ok(())
    }
}

/// Whether a run with this status should be announced.
pub fn should_notify(config: &NotificationConfig, status: OverallStatus) -> bool {
    match status {
        OverallStatus::AllSuccess => config.send_on_success,
        OverallStatus::PartialFailure | OverallStatus::AllFailed => config.send_on_failure,
    }
}
