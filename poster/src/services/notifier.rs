//! Operator notification
//!
//! Failure reports go to a webhook when one is configured, otherwise they are only
//! logged.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use shared::{run_error, run_info};

use crate::error::{PosterError, PosterResult};
use crate::traits::Notifier;
use crate::types::FailureReport;

/// Notifier posting the JSON report to a webhook URL
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url, timeout: Duration) -> PosterResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, report: &FailureReport) -> PosterResult<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(report)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PosterError::Notify {
                message: format!("webhook answered HTTP {}", response.status()),
            });
        }
        run_info!(report.run_id, "📨 Operator notified about {} failure", report.stage);
        Ok(())
    }
}

/// Notifier that only writes the report to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, report: &FailureReport) -> PosterResult<()> {
        run_error!(
            report.run_id,
            stage = %report.stage,
            data_defect = report.data_defect,
            "🚨 Operator attention needed for {}: {}",
            report
                .image_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "<no candidate>".to_string()),
            report.message
        );
        Ok(())
    }
}

/// Notifier selected at startup from configuration
pub enum OperatorNotifier {
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl OperatorNotifier {
    /// Webhook when a URL is configured, log-only otherwise
    pub fn from_webhook(url: Option<Url>, timeout: Duration) -> PosterResult<Self> {
        match url {
            Some(url) => Ok(OperatorNotifier::Webhook(WebhookNotifier::new(url, timeout)?)),
            None => Ok(OperatorNotifier::Log(LogNotifier)),
        }
    }
}

#[async_trait]
impl Notifier for OperatorNotifier {
    async fn notify(&self, report: &FailureReport) -> PosterResult<()> {
        match self {
            OperatorNotifier::Webhook(webhook) => {
                // Logged first, then sent
                LogNotifier.notify(report).await?;
                webhook.notify(report).await
            }
            OperatorNotifier::Log(log) => log.notify(report).await,
        }
    }
}
