//! Scheduler loop against the coordinator.

use std::sync::Arc;
use std::time::Duration;

use tickerwatch::engine::coordinator::RunCoordinator;
use tickerwatch::engine::detector::ChangeDetector;
use tickerwatch::engine::scheduler;
use tickerwatch::storage::TrackingStore;

use crate::mock_collaborators::{row, scratch_dir, Gate, RecordingNotifier, ScriptedSource};

#[tokio::test]
async fn ticks_until_shutdown() {
    let dir = scratch_dir();
    let store = TrackingStore::new(dir.join("tracking.json"));
    let source = Arc::new(ScriptedSource::repeating(vec![row("AAPL", "1.0%", "190.00")]));
    let coord = Arc::new(RunCoordinator::new(
        source.clone(),
        store.clone(),
        Arc::new(RecordingNotifier::new()),
        ChangeDetector::default(),
        3.0,
    ));

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let loop_task = tokio::spawn(scheduler::run(
        Arc::clone(&coord),
        Duration::from_millis(20),
        async move {
            let _ = stop_rx.await;
        },
    ));

    tokio::time::sleep(Duration::from_millis(150)).await;
    stop_tx.send(()).unwrap();
    loop_task.await.unwrap();

    // First tick fires immediately, later ones on the interval.
    assert!(source.fetch_count() >= 2);
    assert_eq!(store.load().get("AAPL"), Some(&1.0));
    assert!(!coord.is_running());

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn slow_cycle_skips_ticks_and_finishes_on_shutdown() {
    let dir = scratch_dir();
    let store = TrackingStore::new(dir.join("tracking.json"));
    let gate = Gate::default();
    let source = Arc::new(
        ScriptedSource::repeating(vec![row("AAPL", "1.0%", "190.00")]).gated(gate.clone()),
    );
    let coord = Arc::new(RunCoordinator::new(
        source.clone(),
        store.clone(),
        Arc::new(RecordingNotifier::new()),
        ChangeDetector::default(),
        3.0,
    ));

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let loop_task = tokio::spawn(scheduler::run(
        Arc::clone(&coord),
        Duration::from_millis(10),
        async move {
            let _ = stop_rx.await;
        },
    ));

    // Hold the first fetch open across several ticks.
    gate.started.notified().await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(source.fetch_count(), 1);
    assert!(coord.is_running());

    // Shut down while the cycle is in flight, then let it complete.
    stop_tx.send(()).unwrap();
    gate.release.notify_one();
    loop_task.await.unwrap();

    assert_eq!(store.load().get("AAPL"), Some(&1.0));

    std::fs::remove_dir_all(dir).unwrap();
}
