//! A sink for sending alarm notifications to Slack.

use crate::core::{AlarmRecord, NotificationSink};
use crate::formatting::TextFormatter;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

/// Posts formatted alarm records to a Slack incoming webhook.
pub struct SlackSink {
    webhook_url: String,
    formatter: Box<dyn TextFormatter>,
    client: reqwest::Client,
}

impl SlackSink {
    /// Creates a new `SlackSink`.
    pub fn new(webhook_url: String, formatter: Box<dyn TextFormatter>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            webhook_url,
            formatter,
            client,
        })
    }
}

#[async_trait]
impl NotificationSink for SlackSink {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, record: &AlarmRecord) -> anyhow::Result<()> {
        if record.is_empty() {
            return Ok(());
        }

        let payload = json!({ "text": self.formatter.format_record(record) });
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            info!(count = record.count_all(), "Sent alarm record to Slack");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                body = %body,
                "Failed to send Slack notification"
            );
            anyhow::bail!("Slack webhook returned status {status}: {body}");
        }
    }
}
