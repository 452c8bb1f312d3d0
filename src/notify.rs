use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::NOTIFY_TIMEOUT_SECS;
use crate::error::{AppError, Result};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, webhook_url: &str, content: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts `{ "content": ... }` to a Discord-style incoming webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, webhook_url: &str, content: &str) -> Result<()> {
        let resp = self
            .client
            .post(webhook_url)
            .json(&WebhookPayload { content })
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("webhook POST failed: {}", e.without_url())))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Notification(format!("webhook responded {status}")));
        }
        info!(content_len = content.len(), "Notification delivered");
        Ok(())
    }
}

/// Message body: the mention tag on its own line, then the summary.
pub fn format_notification(mention_tag: &str, summary: &str) -> String {
    format!("<{mention_tag}>\n{summary}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_tag_leads_the_message() {
        assert_eq!(
            format_notification("@&123456", "Regn i eftermiddag ☔"),
            "<@&123456>\nRegn i eftermiddag ☔"
        );
    }

    #[test]
    fn payload_serializes_as_content_field() {
        let v = serde_json::to_value(WebhookPayload { content: "hej" }).unwrap();
        assert_eq!(v, serde_json::json!({ "content": "hej" }));
    }
}
