//! Per-channel filter criteria and dispatch gating.

use crate::core::{AlarmRecord, AlarmState};
use std::collections::BTreeSet;

/// Decides whether a filtered record triggers a send at all.
///
/// Activation-gated channels (email, chat platforms) only notify on newly
/// active alarms; all-events channels (syslog) forward clearances and
/// acknowledgements too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchGate {
    /// Send only when the filtered record contains `come` entries.
    Activations,
    /// Send whenever the filtered record is non-empty.
    AllEvents,
}

/// The filter criteria of one notification channel.
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    pub priorities: BTreeSet<u8>,
    pub states: BTreeSet<AlarmState>,
    pub gate: DispatchGate,
}

impl ChannelFilter {
    /// Applies the two-stage filter and the dispatch gate.
    ///
    /// Returns the filtered record when the gate triggers, `None`
    /// otherwise. The input record is never mutated; every channel
    /// filters the same raw snapshot independently.
    pub fn select(&self, record: &AlarmRecord) -> Option<AlarmRecord> {
        let filtered = record
            .filter_by_priorities(&self.priorities)
            .filter_by_states(&self.states);

        let triggered = match self.gate {
            DispatchGate::Activations => filtered.count_come() > 0,
            DispatchGate::AllEvents => filtered.count_all() > 0,
        };
        triggered.then_some(filtered)
    }
}
