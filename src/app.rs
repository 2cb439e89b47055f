//! The main application logic, decoupled from the entry point.

use crate::{
    channel::DispatchGate,
    config::Config,
    core::{AlarmSource, NotificationSink},
    formatting::{CodeBlockFormatter, PlainTextFormatter},
    notification::{email::EmailSink, slack::SlackSink, syslog::SyslogSink, zulip::ZulipSink},
    poller::{Channel, PollLoop},
    source::HttpAlarmSource,
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// A handle to the running application.
pub struct App {
    poll_task: JoinHandle<Result<()>>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Waits for the poll loop to finish. It exits on the shutdown signal
    /// or on a fatal source error; either way the source connection has
    /// already been closed by the loop itself.
    pub async fn run(self) -> Result<()> {
        self.poll_task.await?
    }
}

/// Builder for the main application.
///
/// Separates component construction from running, and lets tests swap the
/// alarm source and sinks for fakes.
pub struct AppBuilder {
    config: Config,
    source_override: Option<Box<dyn AlarmSource>>,
    channels_override: Option<Vec<Channel>>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            source_override: None,
            channels_override: None,
        }
    }

    /// Overrides the alarm source for testing.
    pub fn source_override(mut self, source: Box<dyn AlarmSource>) -> Self {
        self.source_override = Some(source);
        self
    }

    /// Overrides the channel list for testing.
    pub fn channels_override(mut self, channels: Vec<Channel>) -> Self {
        self.channels_override = Some(channels);
        self
    }

    /// Builds the channel list from the configuration, in the fixed
    /// dispatch order: email, syslog, Slack, Zulip.
    async fn build_channels(config: &Config) -> Result<Vec<Channel>> {
        let mut channels = Vec::new();

        if let Some(email) = &config.channels.email {
            if email.filter.enabled {
                let sink: Arc<dyn NotificationSink> =
                    Arc::new(EmailSink::new(email, Box::new(PlainTextFormatter))?);
                channels.push(Channel {
                    filter: email.filter.to_filter(DispatchGate::Activations),
                    sink,
                });
            }
        }
        if let Some(syslog) = &config.channels.syslog {
            if syslog.filter.enabled {
                let sink: Arc<dyn NotificationSink> = Arc::new(SyslogSink::new(syslog).await?);
                channels.push(Channel {
                    filter: syslog.filter.to_filter(DispatchGate::AllEvents),
                    sink,
                });
            }
        }
        if let Some(slack) = &config.channels.slack {
            if slack.filter.enabled {
                let sink: Arc<dyn NotificationSink> = Arc::new(SlackSink::new(
                    slack.webhook_url.clone(),
                    Box::new(CodeBlockFormatter),
                )?);
                channels.push(Channel {
                    filter: slack.filter.to_filter(DispatchGate::Activations),
                    sink,
                });
            }
        }
        if let Some(zulip) = &config.channels.zulip {
            if zulip.filter.enabled {
                let sink: Arc<dyn NotificationSink> =
                    Arc::new(ZulipSink::new(zulip, Box::new(CodeBlockFormatter))?);
                channels.push(Channel {
                    filter: zulip.filter.to_filter(DispatchGate::Activations),
                    sink,
                });
            }
        }
        Ok(channels)
    }

    /// Builds all components and spawns the poll loop task.
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;

        let source: Box<dyn AlarmSource> = match self.source_override {
            Some(source) => source,
            None => Box::new(HttpAlarmSource::new(&config.source)?),
        };

        let channels = match self.channels_override {
            Some(channels) => channels,
            None => Self::build_channels(&config).await?,
        };
        info!(channels = channels.len(), "Notification channels configured");

        let poll_loop = PollLoop::new(
            source,
            channels,
            Duration::from_secs(config.poll_interval_seconds),
            config.max_window_seconds.map(Duration::from_secs),
        );
        let poll_task = tokio::spawn(poll_loop.run(shutdown_rx));

        Ok(App { poll_task })
    }
}
