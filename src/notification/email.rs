//! A sink sending alarm notification emails via SMTP.

use crate::config::EmailChannelConfig;
use crate::core::{AlarmRecord, NotificationSink};
use crate::formatting::TextFormatter;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

/// Sends one plain-text email per dispatched record, addressed to every
/// configured recipient.
pub struct EmailSink {
    from_address: String,
    to_addresses: Vec<String>,
    formatter: Box<dyn TextFormatter>,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailSink {
    pub fn new(
        config: &EmailChannelConfig,
        formatter: Box<dyn TextFormatter>,
    ) -> anyhow::Result<Self> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            from_address: config.from_address.clone(),
            to_addresses: config.to_addresses.clone(),
            formatter,
            mailer: builder.build(),
        })
    }

    fn build_message(&self, record: &AlarmRecord) -> anyhow::Result<Message> {
        let subject = format!("[alarmwatch] {} new alarms", record.count_come());
        let mut builder = Message::builder()
            .from(self.from_address.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for to in &self.to_addresses {
            builder = builder.to(to.parse()?);
        }
        Ok(builder.body(self.formatter.format_record(record))?)
    }
}

#[async_trait]
impl NotificationSink for EmailSink {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, record: &AlarmRecord) -> anyhow::Result<()> {
        if record.is_empty() {
            return Ok(());
        }
        let message = self.build_message(record)?;
        self.mailer.send(message).await?;
        info!(
            count = record.count_come(),
            recipients = self.to_addresses.len(),
            "Sent alarm email"
        );
        Ok(())
    }
}
