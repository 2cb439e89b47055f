//! A sink forwarding alarm entries to a syslog server over UDP.
//!
//! Unlike the chat and email sinks, syslog receives one RFC 3164 datagram
//! per entry, in arrival order, so activation and clearance events both
//! show up in the server's log stream.

use crate::config::SyslogChannelConfig;
use crate::core::{AlarmEntry, AlarmRecord, AlarmState, NotificationSink};
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::info;

const SYSLOG_TIME_FORMAT: &str = "%b %e %H:%M:%S";

/// Syslog severity for an alarm state.
fn severity(state: AlarmState) -> u8 {
    match state {
        AlarmState::Come => 4,         // warning
        AlarmState::Gone => 5,         // notice
        AlarmState::Acknowledged => 6, // informational
    }
}

/// Formats one entry as an RFC 3164 message with the given facility.
fn syslog_line(entry: &AlarmEntry, facility: u8) -> String {
    let pri = facility * 8 + severity(entry.state);
    format!(
        "<{}>{} alarmwatch: [P{}] {} {}: {}",
        pri,
        entry.timestamp.format(SYSLOG_TIME_FORMAT),
        entry.priority,
        entry.state,
        entry.tag,
        entry.text
    )
}

/// Sends alarm entries as UDP syslog datagrams.
pub struct SyslogSink {
    socket: UdpSocket,
    target: String,
    facility: u8,
}

impl SyslogSink {
    pub async fn new(config: &SyslogChannelConfig) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self {
            socket,
            target: config.address.clone(),
            facility: config.facility,
        })
    }
}

#[async_trait]
impl NotificationSink for SyslogSink {
    fn name(&self) -> &str {
        "syslog"
    }

    async fn send(&self, record: &AlarmRecord) -> anyhow::Result<()> {
        for entry in record.iter() {
            let message = syslog_line(entry, self.facility);
            self.socket
                .send_to(message.as_bytes(), self.target.as_str())
                .await?;
        }
        info!(
            count = record.count_all(),
            target = %self.target,
            "Forwarded alarm record to syslog"
        );
        Ok(())
    }
}
