//! Integration tests for the provider stream engine.
//!
//! These tests drive the engine against the in-memory transport from
//! `common`, covering:
//! - claim handshake success, rejection, and timeout
//! - ack-before-callback ordering
//! - strict FIFO actuation dispatch
//! - single-writer serialization of concurrent publishes
//! - idempotent shutdown

mod common;

use common::{mock_transport, MockServer};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use vss_sdk::broker::{ActuateCommand, SignalSelector, StreamEvent, StreamFrame};
use vss_sdk::provider::{ActuatorProvider, EngineState, ProviderConfig, ProviderError};
use vss_sdk::value::Value;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn quick_config() -> ProviderConfig {
    ProviderConfig::default().with_claim_timeout(Duration::from_millis(200))
}

fn command(selector: SignalSelector, value: Value) -> ActuateCommand {
    ActuateCommand { selector, value }
}

async fn wait_sent(server: &MockServer, count: usize) {
    tokio::time::timeout(TEST_TIMEOUT, server.wait_for_sent(count))
        .await
        .expect("timed out waiting for outbound frames");
}

// =============================================================================
// Claim handshake
// =============================================================================

#[tokio::test]
async fn test_start_succeeds_on_confirmation() {
    let (transport, server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]).auto_confirm();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();

    provider.start().await.unwrap();
    assert_eq!(provider.state(), EngineState::Streaming);

    let frames = server.sent_frames();
    assert_eq!(
        frames[0],
        StreamFrame::Claim {
            paths: vec!["A.B".to_string()],
        }
    );

    provider.stop().await;
    assert_eq!(provider.state(), EngineState::Stopped);
    assert!(server.sink_closed());
}

#[tokio::test]
async fn test_start_times_out_without_confirmation() {
    let (transport, server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]);
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();

    let result = provider.start().await;
    assert!(matches!(result, Err(ProviderError::ClaimTimeout(_))));
    assert_eq!(provider.state(), EngineState::Failed);

    // No worker is left behind: a command scripted now is never acked.
    server.send_event(StreamEvent::ActuateBatch(vec![command(
        SignalSelector::Id(1),
        Value::Bool(true),
    )]));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.sent_frames().len(), 1, "only the claim was written");
}

#[tokio::test]
async fn test_start_fails_when_stream_ends_before_confirmation() {
    let (transport, _server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]).close_on_claim();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();

    let result = provider.start().await;
    assert!(matches!(result, Err(ProviderError::ClaimRejected)));
    assert!(provider.state().is_failed());
}

#[tokio::test]
async fn test_start_without_transport_fails() {
    let (transport, _server) = mock_transport();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.disconnect().await;

    let result = provider.start().await;
    assert!(matches!(result, Err(ProviderError::NotConnected)));
}

// =============================================================================
// Actuation dispatch
// =============================================================================

#[tokio::test]
async fn test_ack_written_before_callback_runs() {
    let (transport, server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]).auto_confirm();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();

    // The callback blocks until released, long after the ack assertion:
    // if the ack waited for the callback, it would never appear.
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let entered = Arc::new(AtomicUsize::new(0));
    let entered_in_callback = Arc::clone(&entered);
    provider.on_actuate_request(move |_request| {
        entered_in_callback.fetch_add(1, Ordering::SeqCst);
        let _ = release_rx.lock().unwrap().recv();
    });

    provider.start().await.unwrap();
    server.send_event(StreamEvent::ActuateBatch(vec![command(
        SignalSelector::Id(1),
        Value::Bool(true),
    )]));

    wait_sent(&server, 2).await;
    let frames = server.sent_frames();
    assert_eq!(frames[1], StreamFrame::Ack { signal_id: 1 });

    release_tx.send(()).unwrap();
    provider.stop().await;
    assert_eq!(entered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_actuation_callbacks_fire_in_arrival_order() {
    let (transport, server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]).auto_confirm();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();

    // Spans of each callback: (sequence, started, finished). The first
    // command is slow; FIFO order must hold regardless.
    let spans: Arc<Mutex<Vec<(i32, Instant, Instant)>>> = Arc::new(Mutex::new(Vec::new()));
    let spans_in_callback = Arc::clone(&spans);
    provider.on_actuate_request(move |request| {
        let started = Instant::now();
        let Value::Int32(sequence) = request.value else {
            panic!("unexpected value kind");
        };
        let delay_ms = if sequence == 1 { 300 } else { 10 };
        std::thread::sleep(Duration::from_millis(delay_ms));
        spans_in_callback
            .lock()
            .unwrap()
            .push((sequence, started, Instant::now()));
    });

    provider.start().await.unwrap();
    server.send_event(StreamEvent::ActuateBatch(vec![
        command(SignalSelector::Id(1), Value::Int32(1)),
        command(SignalSelector::Id(1), Value::Int32(2)),
        command(SignalSelector::Id(1), Value::Int32(3)),
    ]));

    // Three acks (after the claim), then drain the callbacks.
    wait_sent(&server, 4).await;
    let deadline = Instant::now() + TEST_TIMEOUT;
    while spans.lock().unwrap().len() < 3 {
        assert!(Instant::now() < deadline, "callbacks did not complete");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let spans = spans.lock().unwrap();
    let order: Vec<i32> = spans.iter().map(|(sequence, _, _)| *sequence).collect();
    assert_eq!(order, vec![1, 2, 3]);
    // Strict serialization: each callback starts only after the previous
    // one has finished.
    assert!(spans[1].1 >= spans[0].2);
    assert!(spans[2].1 >= spans[1].2);
    drop(spans);

    provider.stop().await;
}

#[tokio::test]
async fn test_unknown_signal_commands_are_dropped() {
    let (transport, server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]).auto_confirm();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();

    let invoked = Arc::new(AtomicUsize::new(0));
    let invoked_in_callback = Arc::clone(&invoked);
    provider.on_actuate_request(move |_request| {
        invoked_in_callback.fetch_add(1, Ordering::SeqCst);
    });

    provider.start().await.unwrap();
    // Unknown id, then unknown path, then a command this provider owns
    // (selected by path to exercise the catalog lookup).
    server.send_event(StreamEvent::ActuateBatch(vec![command(
        SignalSelector::Id(99),
        Value::Bool(true),
    )]));
    server.send_event(StreamEvent::ActuateBatch(vec![command(
        SignalSelector::Path("Not.Owned".to_string()),
        Value::Bool(true),
    )]));
    server.send_event(StreamEvent::ActuateBatch(vec![command(
        SignalSelector::Path("A.B".to_string()),
        Value::Bool(true),
    )]));

    // Exactly one ack: the unknown commands are dropped without one, and
    // the stream stays healthy enough to process the owned command.
    wait_sent(&server, 2).await;
    let frames = server.sent_frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1], StreamFrame::Ack { signal_id: 1 });

    provider.stop().await;
    assert_eq!(invoked.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Publish path
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishes_serialize_whole_frames() {
    let (transport, server) = mock_transport();
    let paths: Vec<String> = (0..50).map(|i| format!("Test.Signal{}", i)).collect();
    let transport = transport
        .with_metadata(
            paths
                .iter()
                .enumerate()
                .map(|(i, path)| (path.clone(), i as i32 + 1)),
        )
        .auto_confirm();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    provider.provide_actuators(&path_refs).await.unwrap();
    provider.start().await.unwrap();

    let handle = provider.publish_handle();
    let threads: Vec<_> = paths
        .iter()
        .cloned()
        .map(|path| {
            let handle = handle.clone();
            std::thread::spawn(move || handle.publish_actual(path, Value::Bool(true)))
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    // The claim plus exactly one whole frame per publish call.
    wait_sent(&server, 51).await;
    let mut seen = HashSet::new();
    for frame in server.sent_frames().into_iter().skip(1) {
        match frame {
            StreamFrame::Publish { entries } => {
                assert_eq!(entries.len(), 1, "one entry per publish call");
                for (id, value) in entries {
                    assert_eq!(value, Value::Bool(true));
                    assert!(seen.insert(id), "duplicate publish frame for id {}", id);
                }
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }
    assert_eq!(seen.len(), 50);

    provider.stop().await;
}

#[tokio::test]
async fn test_publish_for_unresolved_path_is_dropped() {
    let (transport, server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]).auto_confirm();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();
    provider.start().await.unwrap();

    provider.publish_actual("Never.Resolved", Value::Int32(1));
    provider.publish_actual("A.B", Value::Int32(2));

    // Only the resolvable publish produces a frame.
    wait_sent(&server, 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let frames = server.sent_frames();
    assert_eq!(frames.len(), 2);
    match &frames[1] {
        StreamFrame::Publish { entries } => {
            assert_eq!(entries.get(&1), Some(&Value::Int32(2)));
        }
        other => panic!("unexpected frame: {:?}", other),
    }

    provider.stop().await;
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_stop_is_idempotent() {
    let (transport, _server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]).auto_confirm();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();
    provider.start().await.unwrap();

    tokio::time::timeout(TEST_TIMEOUT, provider.stop())
        .await
        .expect("first stop deadlocked");
    assert_eq!(provider.state(), EngineState::Stopped);

    tokio::time::timeout(TEST_TIMEOUT, provider.stop())
        .await
        .expect("second stop deadlocked");
    assert_eq!(provider.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_stop_before_start_is_a_no_op() {
    let (transport, _server) = mock_transport();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.stop().await;
    assert_eq!(provider.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_callback() {
    let (transport, server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]).auto_confirm();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();

    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let started_in_callback = Arc::clone(&started);
    let finished_in_callback = Arc::clone(&finished);
    provider.on_actuate_request(move |_request| {
        started_in_callback.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(150));
        finished_in_callback.fetch_add(1, Ordering::SeqCst);
    });

    provider.start().await.unwrap();
    server.send_event(StreamEvent::ActuateBatch(vec![command(
        SignalSelector::Id(1),
        Value::Bool(true),
    )]));
    wait_sent(&server, 2).await;
    let deadline = Instant::now() + TEST_TIMEOUT;
    while started.load(Ordering::SeqCst) == 0 {
        assert!(Instant::now() < deadline, "callback never started");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Shutdown never interrupts the in-flight callback.
    provider.stop().await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

// =============================================================================
// End to end
// =============================================================================

#[tokio::test]
async fn test_end_to_end_actuate_ack_callback_publish() {
    let (transport, server) = mock_transport();
    let transport = transport.with_metadata([("A.B", 1)]).auto_confirm();
    let mut provider = ActuatorProvider::with_transport(transport, quick_config());
    provider.provide_actuators(&["A.B"]).await.unwrap();

    let publisher = provider.publish_handle();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let observed_in_callback = Arc::clone(&observed);
    provider.on_actuate_request(move |request| {
        observed_in_callback.lock().unwrap().push(request.clone());
        // Reporting back from inside the callback must not block or
        // deadlock: the publish path is queue-decoupled.
        publisher.publish_actual(request.path, request.value);
    });

    provider.start().await.unwrap();
    server.send_event(StreamEvent::ActuateBatch(vec![command(
        SignalSelector::Path("A.B".to_string()),
        Value::Bool(true),
    )]));

    // Claim, then the ack, then exactly one publish frame.
    wait_sent(&server, 3).await;
    let frames = server.sent_frames();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[1], StreamFrame::Ack { signal_id: 1 });
    match &frames[2] {
        StreamFrame::Publish { entries } => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries.get(&1), Some(&Value::Bool(true)));
        }
        other => panic!("unexpected frame: {:?}", other),
    }

    {
        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].path, "A.B");
        assert_eq!(observed[0].value, Value::Bool(true));
    }

    provider.stop().await;
}
