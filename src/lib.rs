//! alarmwatch - A poll-and-forward alarm notifier
//!
//! This library provides the core functionality for polling a
//! plant-monitoring alarm source over a sliding time window and forwarding
//! matching alarm events to notification channels.

pub mod app;
pub mod channel;
pub mod cli;
pub mod config;
pub mod core;
pub mod formatting;
pub mod notification;
pub mod poller;
pub mod query;
pub mod source;
pub mod window;

// Re-export core types for convenience
pub use crate::core::*;
