use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{MonitorStatus, Target};
use crate::error::NotifyError;

/// Delivers a JSON body to a subscriber URL. One attempt, no retries.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<(), NotifyError>;
}

pub struct ReqwestWebhookClient {
    client: reqwest::Client,
}

impl ReqwestWebhookClient {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("uppe-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookClient for ReqwestWebhookClient {
    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<(), NotifyError> {
        let response = self.client.post(url).timeout(timeout).json(body).send().await.map_err(
            |e| {
                if e.is_timeout() { NotifyError::Timeout } else { NotifyError::Transport(e) }
            },
        )?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        Ok(())
    }
}

/// Body posted to subscribers on every transition
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub monitor_status: MonitorStatus,
    /// Unix seconds
    pub timestamp: i64,
}

/// Best-effort transition notifications
pub struct Notifier {
    client: Arc<dyn WebhookClient>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(client: Arc<dyn WebhookClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Notify the target's subscriber, if it has one. Returns whether the
    /// webhook accepted the call; failures are logged and go no further.
    pub async fn notify(&self, target: &Target, status: MonitorStatus) -> bool {
        let Some(url) = target.webhook_url.as_deref() else {
            return false;
        };

        let payload = WebhookPayload { monitor_status: status, timestamp: Utc::now().timestamp() };
        let body = match serde_json::to_value(&payload) {
            Ok(body) => body,
            Err(e) => {
                warn!(address = %target.address, "Failed to encode webhook payload: {}", e);
                return false;
            }
        };

        match self.client.post(url, &body, self.timeout).await {
            Ok(()) => {
                debug!(address = %target.address, %status, "Webhook delivered");
                true
            }
            Err(e) => {
                warn!(address = %target.address, webhook = url, "Webhook delivery failed: {}", e);
                false
            }
        }
    }
}
