//! Core domain types and service traits for alarmwatch
//!
//! This module defines the alarm data model and the trait contracts that
//! govern component interactions: the alarm source the poll loop queries
//! and the notification sinks it dispatches to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The lifecycle state of an alarm event.
///
/// `Come` marks an alarm becoming active, `Gone` its clearance, and
/// `Acknowledged` an operator acknowledgement. Activation-gated channels
/// only ever see `Come` entries; all-events channels may forward any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    Come,
    Gone,
    Acknowledged,
}

impl std::fmt::Display for AlarmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlarmState::Come => write!(f, "come"),
            AlarmState::Gone => write!(f, "gone"),
            AlarmState::Acknowledged => write!(f, "acknowledged"),
        }
    }
}

/// A single timestamped alarm event from the monitored plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmEntry {
    /// When the event was recorded at the source.
    pub timestamp: DateTime<Utc>,
    /// Ordered priority; lower numbers are more urgent.
    pub priority: u8,
    /// Activation / clearance / acknowledgement state.
    pub state: AlarmState,
    /// Identifier of the alarm point (tag name) at the source.
    pub tag: String,
    /// Free-form message text attached to the event.
    pub text: String,
}

/// An ordered snapshot of alarm entries from one poll cycle.
///
/// Arrival order is preserved; syslog emission relies on it. All filter
/// operations return a fresh record and never mutate the source, so the
/// same raw result can be filtered independently per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlarmRecord {
    entries: Vec<AlarmEntry>,
}

impl AlarmRecord {
    /// Number of entries whose state is `Come`.
    pub fn count_come(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == AlarmState::Come)
            .count()
    }

    /// Total number of entries.
    pub fn count_all(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a new record containing only entries whose priority is in
    /// `priorities`. An empty set matches nothing.
    pub fn filter_by_priorities(&self, priorities: &BTreeSet<u8>) -> AlarmRecord {
        self.entries
            .iter()
            .filter(|e| priorities.contains(&e.priority))
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }

    /// Returns a new record containing only entries whose state is in
    /// `states`. An empty set matches nothing.
    pub fn filter_by_states(&self, states: &BTreeSet<AlarmState>) -> AlarmRecord {
        self.entries
            .iter()
            .filter(|e| states.contains(&e.state))
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }

    /// Iterates the entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &AlarmEntry> {
        self.entries.iter()
    }
}

impl From<Vec<AlarmEntry>> for AlarmRecord {
    fn from(entries: Vec<AlarmEntry>) -> Self {
        Self { entries }
    }
}

/// Errors raised by an [`AlarmSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Startup connection failure. Fatal; the poll loop does not retry it.
    #[error("alarm source connection failed: {0}")]
    Connection(String),

    /// Per-cycle query failure. Recoverable; the loop keeps the current
    /// time window and retries next cycle.
    #[error("alarm source query failed: {0}")]
    Query(String),
}

// =============================================================================
// Service Traits
// =============================================================================

/// The alarm source the poll loop queries each cycle.
///
/// The query representation is opaque to the loop; it is produced by
/// [`crate::query::build_alarm_query`] and passed through verbatim.
#[async_trait]
pub trait AlarmSource: Send + Sync {
    /// Opens the connection. Called exactly once before the first cycle.
    async fn connect(&mut self) -> Result<(), SourceError>;

    /// Executes a query, buffering its result until `fetch_record`.
    async fn execute(&mut self, query: &str) -> Result<(), SourceError>;

    /// Materializes the buffered result of the last `execute` call.
    async fn fetch_record(&mut self) -> Result<AlarmRecord, SourceError>;

    /// Releases the connection. Idempotent; must not fail.
    async fn close(&mut self);
}

/// Sends a filtered alarm record to one notification destination.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// A unique, descriptive name for the sink (e.g., "email", "syslog").
    /// Used for logging.
    fn name(&self) -> &str;

    /// Delivers the record.
    ///
    /// # Returns
    /// * `Ok(())` if the record was successfully sent
    /// * `Err` if sending failed (network error, formatting error, etc.)
    async fn send(&self, record: &AlarmRecord) -> anyhow::Result<()>;
}
