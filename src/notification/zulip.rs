//! A sink for sending alarm notifications to a Zulip stream.

use crate::config::ZulipChannelConfig;
use crate::core::{AlarmRecord, NotificationSink};
use crate::formatting::TextFormatter;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info};

/// Posts formatted alarm records to a Zulip stream via the messages API,
/// authenticating as a bot user.
pub struct ZulipSink {
    site: String,
    bot_email: String,
    api_key: String,
    stream: String,
    topic: String,
    formatter: Box<dyn TextFormatter>,
    client: reqwest::Client,
}

impl ZulipSink {
    pub fn new(
        config: &ZulipChannelConfig,
        formatter: Box<dyn TextFormatter>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            site: config.site.trim_end_matches('/').to_string(),
            bot_email: config.bot_email.clone(),
            api_key: config.api_key.clone(),
            stream: config.stream.clone(),
            topic: config.topic.clone(),
            formatter,
            client,
        })
    }
}

#[async_trait]
impl NotificationSink for ZulipSink {
    fn name(&self) -> &str {
        "zulip"
    }

    async fn send(&self, record: &AlarmRecord) -> anyhow::Result<()> {
        if record.is_empty() {
            return Ok(());
        }

        let url = format!("{}/api/v1/messages", self.site);
        let content = self.formatter.format_record(record);
        let params = [
            ("type", "stream"),
            ("to", self.stream.as_str()),
            ("topic", self.topic.as_str()),
            ("content", content.as_str()),
        ];
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.bot_email, Some(&self.api_key))
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            info!(count = record.count_all(), "Sent alarm record to Zulip");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                body = %body,
                "Failed to send Zulip notification"
            );
            anyhow::bail!("Zulip API returned status {status}: {body}");
        }
    }
}
