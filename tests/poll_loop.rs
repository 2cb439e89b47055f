//! Integration tests for the poll–filter–dispatch loop, driven end to end
//! with a scriptable alarm source and fake notification sinks.

mod helpers;

use alarmwatch::channel::{ChannelFilter, DispatchGate};
use alarmwatch::core::AlarmState;
use alarmwatch::poller::{Channel, PollLoop};
use helpers::{entry, query_bounds, FakeAlarmSource, RecordingSink, FailingSink, Scripted};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

const FAST_INTERVAL: Duration = Duration::from_millis(20);

fn channel(
    priorities: &[u8],
    states: &[AlarmState],
    gate: DispatchGate,
    sink: Arc<dyn alarmwatch::core::NotificationSink>,
) -> Channel {
    Channel {
        filter: ChannelFilter {
            priorities: priorities.iter().copied().collect(),
            states: states.iter().copied().collect(),
            gate,
        },
        sink,
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met within 5 seconds");
}

#[tokio::test]
async fn window_is_kept_on_failure_and_advanced_on_success() {
    let (source, state) = FakeAlarmSource::new(vec![
        Scripted::QueryError,
        Scripted::Rows(vec![entry(1, AlarmState::Come, "PUMP_01")]),
    ]);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_loop = PollLoop::new(Box::new(source), vec![], FAST_INTERVAL, None);
    let handle = tokio::spawn(poll_loop.run(shutdown_rx));

    wait_until(|| state.lock().unwrap().queries.len() >= 3).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    let queries = state.lock().unwrap().queries.clone();
    let (begin1, _) = query_bounds(&queries[0]);
    let (begin2, end2) = query_bounds(&queries[1]);
    let (begin3, _) = query_bounds(&queries[2]);

    // Cycle 1 failed: cycle 2 re-covers the same begin.
    assert_eq!(begin1, begin2);
    // Cycle 2 succeeded: cycle 3 starts where cycle 2 ended.
    assert_eq!(begin3, end2);
}

#[tokio::test]
async fn source_error_skips_all_dispatch() {
    let (source, state) = FakeAlarmSource::new(vec![Scripted::QueryError]);
    let (recording, received) = RecordingSink::new("recording");
    let channels = vec![channel(
        &[1, 2, 3],
        &[AlarmState::Come, AlarmState::Gone],
        DispatchGate::AllEvents,
        Arc::new(recording),
    )];

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_loop = PollLoop::new(Box::new(source), channels, FAST_INTERVAL, None);
    let handle = tokio::spawn(poll_loop.run(shutdown_rx));

    // Let the failed cycle and one empty follow-up cycle complete.
    wait_until(|| state.lock().unwrap().queries.len() >= 2).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failing_sink_does_not_block_later_channels() {
    let (source, _state) = FakeAlarmSource::new(vec![Scripted::Rows(vec![entry(
        1,
        AlarmState::Come,
        "PUMP_01",
    )])]);
    let (failing, failing_calls) = FailingSink::new();
    let (recording, received) = RecordingSink::new("recording");
    // The failing sink is dispatched first, in configuration order.
    let channels = vec![
        channel(
            &[1],
            &[AlarmState::Come],
            DispatchGate::Activations,
            Arc::new(failing),
        ),
        channel(
            &[1],
            &[AlarmState::Come],
            DispatchGate::Activations,
            Arc::new(recording),
        ),
    ];

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_loop = PollLoop::new(Box::new(source), channels, FAST_INTERVAL, None);
    let handle = tokio::spawn(poll_loop.run(shutdown_rx));

    wait_until(|| !received.lock().unwrap().is_empty()).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert!(*failing_calls.lock().unwrap() >= 1);
    let received = received.lock().unwrap();
    assert_eq!(received[0].count_all(), 1);
}

#[tokio::test]
async fn channels_filter_the_same_snapshot_independently() {
    let rows = vec![
        entry(1, AlarmState::Come, "PUMP_01"),
        entry(2, AlarmState::Come, "VALVE_07"),
        entry(3, AlarmState::Gone, "TANK_02"),
    ];
    let (source, _state) = FakeAlarmSource::new(vec![Scripted::Rows(rows)]);
    let (email_like, email_received) = RecordingSink::new("email");
    let (syslog_like, syslog_received) = RecordingSink::new("syslog");
    let channels = vec![
        channel(
            &[1, 2],
            &[AlarmState::Come],
            DispatchGate::Activations,
            Arc::new(email_like),
        ),
        channel(
            &[1, 2, 3],
            &[AlarmState::Come, AlarmState::Gone],
            DispatchGate::AllEvents,
            Arc::new(syslog_like),
        ),
    ];

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_loop = PollLoop::new(Box::new(source), channels, FAST_INTERVAL, None);
    let handle = tokio::spawn(poll_loop.run(shutdown_rx));

    wait_until(|| {
        !email_received.lock().unwrap().is_empty() && !syslog_received.lock().unwrap().is_empty()
    })
    .await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    let email_record = &email_received.lock().unwrap()[0];
    assert_eq!(email_record.count_all(), 2);
    assert_eq!(email_record.count_come(), 2);

    let syslog_record = &syslog_received.lock().unwrap()[0];
    assert_eq!(syslog_record.count_all(), 3);
    let tags: Vec<_> = syslog_record.iter().map(|e| e.tag.clone()).collect();
    assert_eq!(tags, vec!["PUMP_01", "VALVE_07", "TANK_02"]);
}

#[tokio::test]
async fn shutdown_during_sleep_exits_promptly_and_closes_source_once() {
    let (source, state) = FakeAlarmSource::new(vec![]);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    // A long interval: the loop must still exit immediately on shutdown.
    let poll_loop = PollLoop::new(Box::new(source), vec![], Duration::from_secs(3600), None);
    let handle = tokio::spawn(poll_loop.run(shutdown_rx));

    // First cycle done, loop is now sleeping.
    wait_until(|| state.lock().unwrap().queries.len() == 1).await;
    shutdown_tx.send(true).unwrap();

    let result = timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop did not exit the sleep on shutdown")
        .unwrap();
    assert!(result.is_ok());

    let state = state.lock().unwrap();
    assert_eq!(state.connect_calls, 1);
    assert_eq!(state.close_calls, 1);
}

#[tokio::test]
async fn fatal_connect_failure_propagates_but_still_closes() {
    let (source, state) = FakeAlarmSource::failing_connect();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_loop = PollLoop::new(Box::new(source), vec![], FAST_INTERVAL, None);

    let result = poll_loop.run(shutdown_rx).await;
    assert!(result.is_err());

    let state = state.lock().unwrap();
    assert_eq!(state.connect_calls, 1);
    assert_eq!(state.queries.len(), 0);
    assert_eq!(state.close_calls, 1);
}
