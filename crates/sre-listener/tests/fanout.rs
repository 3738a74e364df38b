// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fan-out ordering and failure-isolation guarantees, exercised through
//! the mock listener.

use sre_listener::{MockListener, callback};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn each_callback_observes_events_in_order() {
    let mut listener = MockListener::new(Duration::from_millis(10)).with_limit(8);

    let first: Arc<Mutex<Vec<u64>>> = Arc::default();
    let second: Arc<Mutex<Vec<u64>>> = Arc::default();

    for sink in [&first, &second] {
        let sink = Arc::clone(sink);
        listener.on_event(callback(move |event| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(event.slot);
                Ok(())
            }
        }));
    }

    listener.run().await.unwrap();

    let first = first.lock().unwrap().clone();
    let second = second.lock().unwrap().clone();
    assert_eq!(first.len(), 8);
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0] < w[1]), "out of order: {first:?}");
}

#[tokio::test(start_paused = true)]
async fn a_failing_callback_never_aborts_the_loop() {
    let mut listener = MockListener::new(Duration::from_millis(5)).with_limit(5);

    let seen: Arc<Mutex<Vec<String>>> = Arc::default();

    listener.on_event(callback(|_event| async move {
        anyhow::bail!("intentional callback failure")
    }));

    let sink = Arc::clone(&seen);
    listener.on_event(callback(move |event| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push(event.signature);
            Ok(())
        }
    }));

    listener.run().await.unwrap();

    // The second callback received every event despite the first failing
    // each time.
    assert_eq!(seen.lock().unwrap().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn a_suspending_callback_does_not_reorder_deliveries() {
    let mut listener = MockListener::new(Duration::from_millis(5)).with_limit(6);

    let log: Arc<Mutex<Vec<(u8, u64)>>> = Arc::default();

    let slow = Arc::clone(&log);
    listener.on_event(callback(move |event| {
        let slow = Arc::clone(&slow);
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            slow.lock().unwrap().push((0, event.slot));
            Ok(())
        }
    }));

    let fast = Arc::clone(&log);
    listener.on_event(callback(move |event| {
        let fast = Arc::clone(&fast);
        async move {
            fast.lock().unwrap().push((1, event.slot));
            Ok(())
        }
    }));

    listener.run().await.unwrap();

    let log = log.lock().unwrap().clone();
    // Per event: slow callback completes before the fast one starts.
    for pair in log.chunks(2) {
        assert_eq!(pair[0].0, 0);
        assert_eq!(pair[1].0, 1);
        assert_eq!(pair[0].1, pair[1].1);
    }
}

#[tokio::test]
async fn stop_is_idempotent_and_ends_the_loop() {
    let listener = MockListener::new(Duration::from_secs(3600));
    let token = listener.stop_token();
    let handle = tokio::spawn(async move { listener.run().await });

    token.stop();
    token.stop();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("listener did not stop")
        .unwrap();
    result.unwrap();
}
