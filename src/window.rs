//! Time-window bookkeeping for the poll loop.

use chrono::{DateTime, Duration, Utc};

/// The `[begin, end)` interval the next alarm query covers.
///
/// The window only advances after a fully successful poll cycle. On a
/// source error it is left untouched, so the next cycle re-covers the
/// failed range plus whatever time elapsed since. Transient outages widen
/// the window instead of silently dropping alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Initial window at startup: `[now - interval, now)`.
    pub fn initial(now: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            begin: now - interval,
            end: now,
        }
    }

    pub fn begin(&self) -> DateTime<Utc> {
        self.begin
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Moves `end` forward to `now` at the start of a poll cycle.
    ///
    /// `now` earlier than `begin` would violate the `begin <= end`
    /// invariant and is ignored; wall-clock time does not normally run
    /// backwards, but a host clock correction must not produce an
    /// inverted window.
    pub fn refresh_end(&mut self, now: DateTime<Utc>) {
        if now >= self.begin {
            self.end = now;
        }
    }

    /// Advances the window after a successful cycle: `begin := end`,
    /// `end := now`. Never called on a failed cycle.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        self.begin = self.end;
        self.refresh_end(now);
    }

    /// Raises `begin` so the window never exceeds `max_width`.
    ///
    /// The unclamped behavior (unbounded growth while the source stays
    /// unreachable) matches the original service; clamping is an opt-in
    /// safety margin and drops alarms older than `max_width` on recovery.
    pub fn clamp(&mut self, max_width: Duration) {
        if self.end - self.begin > max_width {
            self.begin = self.end - max_width;
        }
    }
}
