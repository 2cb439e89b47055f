//! Shared fakes for integration tests: a scriptable alarm source and
//! recording/failing notification sinks.
#![allow(dead_code)]

use alarmwatch::core::{
    AlarmEntry, AlarmRecord, AlarmSource, AlarmState, NotificationSink, SourceError,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Observable side effects of the fake source, shared with the test body.
#[derive(Default)]
pub struct SourceState {
    pub connect_calls: usize,
    pub close_calls: usize,
    pub queries: Vec<String>,
}

/// One scripted poll-cycle outcome.
pub enum Scripted {
    Rows(Vec<AlarmEntry>),
    QueryError,
}

/// An [`AlarmSource`] that replays scripted results. Once the script is
/// exhausted every further cycle returns an empty row set.
pub struct FakeAlarmSource {
    state: Arc<Mutex<SourceState>>,
    script: Mutex<VecDeque<Scripted>>,
    pending: Option<Vec<AlarmEntry>>,
    fail_connect: bool,
}

impl FakeAlarmSource {
    pub fn new(script: Vec<Scripted>) -> (Self, Arc<Mutex<SourceState>>) {
        let state = Arc::new(Mutex::new(SourceState::default()));
        let source = Self {
            state: state.clone(),
            script: Mutex::new(script.into()),
            pending: None,
            fail_connect: false,
        };
        (source, state)
    }

    pub fn failing_connect() -> (Self, Arc<Mutex<SourceState>>) {
        let (mut source, state) = Self::new(vec![]);
        source.fail_connect = true;
        (source, state)
    }
}

#[async_trait]
impl AlarmSource for FakeAlarmSource {
    async fn connect(&mut self) -> Result<(), SourceError> {
        self.state.lock().unwrap().connect_calls += 1;
        if self.fail_connect {
            Err(SourceError::Connection("scripted refusal".to_string()))
        } else {
            Ok(())
        }
    }

    async fn execute(&mut self, query: &str) -> Result<(), SourceError> {
        self.state.lock().unwrap().queries.push(query.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Rows(rows)) => {
                self.pending = Some(rows);
                Ok(())
            }
            Some(Scripted::QueryError) => {
                Err(SourceError::Query("scripted failure".to_string()))
            }
            None => {
                self.pending = Some(vec![]);
                Ok(())
            }
        }
    }

    async fn fetch_record(&mut self) -> Result<AlarmRecord, SourceError> {
        let rows = self
            .pending
            .take()
            .ok_or_else(|| SourceError::Query("nothing buffered".to_string()))?;
        Ok(rows.into())
    }

    async fn close(&mut self) {
        self.state.lock().unwrap().close_calls += 1;
    }
}

/// A sink that records every record it receives.
pub struct RecordingSink {
    name: &'static str,
    pub received: Arc<Mutex<Vec<AlarmRecord>>>,
}

impl RecordingSink {
    pub fn new(name: &'static str) -> (Self, Arc<Mutex<Vec<AlarmRecord>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Self {
            name,
            received: received.clone(),
        };
        (sink, received)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        self.name
    }

    async fn send(&self, record: &AlarmRecord) -> anyhow::Result<()> {
        self.received.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// A sink that always fails, counting its invocations.
pub struct FailingSink {
    pub calls: Arc<Mutex<usize>>,
}

impl FailingSink {
    pub fn new() -> (Self, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        let sink = Self {
            calls: calls.clone(),
        };
        (sink, calls)
    }
}

#[async_trait]
impl NotificationSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn send(&self, _record: &AlarmRecord) -> anyhow::Result<()> {
        *self.calls.lock().unwrap() += 1;
        anyhow::bail!("scripted send failure")
    }
}

pub fn entry(priority: u8, state: AlarmState, tag: &str) -> AlarmEntry {
    AlarmEntry {
        timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        priority,
        state,
        tag: tag.to_string(),
        text: "integration test alarm".to_string(),
    }
}

/// Extracts the `[begin, end)` bounds embedded in a built query string.
pub fn query_bounds(query: &str) -> (String, String) {
    let parts: Vec<&str> = query.split('\'').collect();
    assert!(parts.len() >= 4, "unexpected query shape: {query}");
    (parts[1].to_string(), parts[3].to_string())
}
