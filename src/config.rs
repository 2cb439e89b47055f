//! Configuration management for alarmwatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from an `alarmwatch.toml` file and merge it
//! with environment variables and command-line arguments.

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::channel::{ChannelFilter, DispatchGate};
use crate::cli::Cli;
use crate::core::AlarmState;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Seconds between poll cycles. Must be positive.
    pub poll_interval_seconds: u64,
    /// Optional maximum query-window width in seconds. When unset the
    /// window grows without bound across source outages.
    #[serde(default)]
    pub max_window_seconds: Option<u64>,
    /// Configuration for the alarm-source connection.
    pub source: SourceConfig,
    /// Per-channel notification configuration.
    pub channels: ChannelsConfig,
}

/// Configuration for the alarm-source HTTP bridge.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    /// Base URL of the alarm gateway.
    pub url: String,
    /// Name of the alarm database to query.
    pub database: String,
    /// Timeout for the startup connection probe, in seconds.
    pub connect_timeout_seconds: u64,
}

/// One section per recognized notification channel. A missing section
/// means the channel is not configured at all.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ChannelsConfig {
    pub email: Option<EmailChannelConfig>,
    pub syslog: Option<SyslogChannelConfig>,
    pub slack: Option<SlackChannelConfig>,
    pub zulip: Option<ZulipChannelConfig>,
}

/// Filter criteria shared by every channel section.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FilterConfig {
    /// Whether this channel participates in dispatch.
    pub enabled: bool,
    /// Priorities forwarded to this channel. An empty set matches nothing.
    pub priorities: BTreeSet<u8>,
    /// States forwarded to this channel. An empty set matches nothing.
    pub states: BTreeSet<AlarmState>,
}

impl FilterConfig {
    /// Builds the runtime filter for this channel with the given gate.
    pub fn to_filter(&self, gate: DispatchGate) -> ChannelFilter {
        ChannelFilter {
            priorities: self.priorities.clone(),
            states: self.states.clone(),
            gate,
        }
    }
}

/// Configuration for email notifications over SMTP.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmailChannelConfig {
    #[serde(flatten)]
    pub filter: FilterConfig,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub to_addresses: Vec<String>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

/// Configuration for syslog forwarding over UDP.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyslogChannelConfig {
    #[serde(flatten)]
    pub filter: FilterConfig,
    /// `host:port` of the syslog server.
    pub address: String,
    /// Syslog facility number (e.g., 16 for local0).
    pub facility: u8,
}

/// Configuration for Slack incoming-webhook notifications.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SlackChannelConfig {
    #[serde(flatten)]
    pub filter: FilterConfig,
    pub webhook_url: String,
}

/// Configuration for Zulip stream notifications.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ZulipChannelConfig {
    #[serde(flatten)]
    pub filter: FilterConfig,
    /// Base URL of the Zulip site, e.g. `https://chat.example.com`.
    pub site: String,
    pub bot_email: String,
    pub api_key: String,
    pub stream: String,
    pub topic: String,
}

impl Config {
    /// Loads the application configuration by layering sources:
    /// defaults, TOML file, environment, and CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| "alarmwatch.toml".into());

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // Allow overriding with environment variables,
            // e.g. ALARMWATCH_POLL_INTERVAL_SECONDS=30
            .merge(Env::prefixed("ALARMWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the poll loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_seconds == 0 {
            bail!("poll_interval_seconds must be positive");
        }
        if self.max_window_seconds == Some(0) {
            bail!("max_window_seconds must be positive when set");
        }

        let filters = [
            ("email", self.channels.email.as_ref().map(|c| &c.filter)),
            ("syslog", self.channels.syslog.as_ref().map(|c| &c.filter)),
            ("slack", self.channels.slack.as_ref().map(|c| &c.filter)),
            ("zulip", self.channels.zulip.as_ref().map(|c| &c.filter)),
        ];
        for (name, filter) in filters {
            if let Some(filter) = filter {
                if filter.enabled && (filter.priorities.is_empty() || filter.states.is_empty()) {
                    bail!(
                        "channel '{name}' is enabled but its priority or state set is empty; \
                         an empty set matches no alarms"
                    );
                }
            }
        }
        Ok(())
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            poll_interval_seconds: 60,
            max_window_seconds: None,
            source: SourceConfig {
                url: "http://localhost:8080".to_string(),
                database: "CC_ALARMS".to_string(),
                connect_timeout_seconds: 10,
            },
            channels: ChannelsConfig::default(),
        }
    }
}
