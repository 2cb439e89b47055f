//! The poll–filter–dispatch control loop.
//!
//! One cycle: refresh the time window, query the alarm source, filter the
//! snapshot per channel, dispatch to every triggered sink, advance the
//! window, sleep. The loop owns the single source connection and runs
//! cycles strictly sequentially; the sleep is raced against the shutdown
//! signal so an operator interrupt is observed mid-sleep, not only at
//! cycle boundaries.

use crate::channel::ChannelFilter;
use crate::core::{AlarmSource, NotificationSink, SourceError};
use crate::query::build_alarm_query;
use crate::window::TimeWindow;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// One configured notification destination: filter criteria plus the sink
/// that receives whatever survives them.
pub struct Channel {
    pub filter: ChannelFilter,
    pub sink: Arc<dyn NotificationSink>,
}

/// The poll loop. Constructed with an explicit configuration snapshot;
/// nothing is read from ambient global state.
pub struct PollLoop {
    source: Box<dyn AlarmSource>,
    channels: Vec<Channel>,
    window: TimeWindow,
    interval: Duration,
    max_window: Option<chrono::Duration>,
}

impl PollLoop {
    /// Sets up the loop with an initial window of `[now - interval, now)`.
    ///
    /// `channels` are dispatched in the order given.
    pub fn new(
        source: Box<dyn AlarmSource>,
        channels: Vec<Channel>,
        interval: Duration,
        max_window: Option<Duration>,
    ) -> Self {
        let chrono_interval = chrono::Duration::from_std(interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        Self {
            source,
            channels,
            window: TimeWindow::initial(Utc::now(), chrono_interval),
            interval,
            max_window: max_window.and_then(|d| chrono::Duration::from_std(d).ok()),
        }
    }

    /// Connects and runs cycles until the shutdown signal fires.
    ///
    /// The source connection is released on every exit path: normal
    /// shutdown, a fatal connect failure, and any future fatal error all
    /// pass through the close below.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let result = self.run_inner(&mut shutdown_rx).await;
        self.source.close().await;
        info!("Alarm source connection closed.");
        result
    }

    async fn run_inner(&mut self, shutdown_rx: &mut watch::Receiver<bool>) -> Result<()> {
        // A connect failure is fatal; there is no retry at this level.
        self.source.connect().await?;
        info!("Connected to alarm source. Entering poll loop.");

        loop {
            let now = Utc::now();
            self.window.refresh_end(now);
            if let Some(max) = self.max_window {
                self.window.clamp(max);
            }

            match self.poll_cycle().await {
                Ok(()) => {
                    self.window.advance(now);
                    info!(begin = %self.window.begin(), "Window advanced");
                }
                Err(e) => {
                    // Recoverable: keep the window so the next cycle
                    // re-covers the failed range.
                    error!(error = %e, "Poll cycle failed; window not advanced");
                }
            }

            debug!(seconds = self.interval.as_secs(), "Going to sleep");
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal received. Leaving poll loop.");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.interval) => {
                    debug!("Back from sleep");
                }
            }
        }
    }

    /// One POLLING stage: query, materialize, filter and dispatch per
    /// channel. Only source-level failures abort the cycle; a failing
    /// sink never blocks the remaining channels.
    async fn poll_cycle(&mut self) -> Result<(), SourceError> {
        let query = build_alarm_query(self.window.begin(), self.window.end());
        debug!(query = %query, "Built alarm query");

        self.source.execute(&query).await?;
        let record = self.source.fetch_record().await?;
        info!(
            come = record.count_come(),
            total = record.count_all(),
            "Poll cycle fetched alarms"
        );
        debug!(?record, "Raw alarm record");

        for channel in &self.channels {
            let Some(filtered) = channel.filter.select(&record) else {
                continue;
            };
            info!(
                sink = channel.sink.name(),
                count = filtered.count_all(),
                "Dispatching alarm record"
            );
            if let Err(e) = channel.sink.send(&filtered).await {
                error!(
                    sink = channel.sink.name(),
                    error = %e,
                    "Send failed; continuing with remaining channels"
                );
            }
        }
        Ok(())
    }
}
