//! Notification sinks for the dispatch stage of the poll loop.
//!
//! Each channel is an interchangeable [`crate::core::NotificationSink`]
//! implementation; the loop knows nothing about the transports behind them.

pub mod email;
pub mod slack;
pub mod syslog;
pub mod zulip;
