//! Full cycle behaviour through `RunCoordinator`.

use std::sync::Arc;
use tokio_test::assert_ok;

use tickerwatch::engine::coordinator::RunCoordinator;
use tickerwatch::engine::detector::{AlertPolicy, ChangeDetector, DetectorConfig, Scope};
use tickerwatch::storage::TrackingStore;
use tickerwatch::types::{Classification, CycleOutcome, FetchResult, ResetOutcome, TrackingState};

use crate::mock_collaborators::{row, scratch_dir, Gate, RecordingNotifier, ScriptedSource};

fn coordinator(
    source: Arc<ScriptedSource>,
    notifier: Arc<RecordingNotifier>,
    store: TrackingStore,
    config: DetectorConfig,
) -> RunCoordinator {
    RunCoordinator::new(source, store, notifier, ChangeDetector::new(config), 3.0)
}

#[tokio::test]
async fn bootstrap_alert_reset_and_reseed() {
    let dir = scratch_dir();
    let store = TrackingStore::new(dir.join("ticker_tracking.json"));
    let source = Arc::new(ScriptedSource::new(vec![
        FetchResult::Rows(vec![row("aapl", "1.00%", "190.00"), row("MSFT", "2.00%", "410.10")]),
        FetchResult::Rows(vec![row("AAPL", "4.50%", "196.70"), row("MSFT", "3.00%", "414.20")]),
        FetchResult::Rows(vec![row("AAPL", "10.00%", "209.00"), row("MSFT", "3.00%", "414.20")]),
    ]));
    let notifier = Arc::new(RecordingNotifier::new());
    let coord = coordinator(
        Arc::clone(&source),
        Arc::clone(&notifier),
        store.clone(),
        DetectorConfig::default(),
    );

    // First run seeds tracking without alerting.
    assert_eq!(
        coord.run_cycle().await,
        CycleOutcome::Quiet {
            tracked: 2,
            persisted: true
        }
    );
    assert_eq!(notifier.count(), 0);
    assert_eq!(store.load().get("AAPL"), Some(&1.0));

    // AAPL rises 3.5 points, MSFT only 1.0.
    assert_eq!(
        coord.run_cycle().await,
        CycleOutcome::Notified {
            alerts: 1,
            tracked: 2,
            persisted: true,
            delivered: true
        }
    );
    let reports = notifier.reports();
    assert_eq!(reports.len(), 1);
    let decision = &reports[0].decisions["AAPL"];
    assert_eq!(decision.classification, Classification::Threshold);
    assert_eq!(decision.previous_value, Some(1.0));
    assert_eq!(decision.delta, Some(3.5));
    assert_eq!(reports[0].observations.len(), 1);
    assert_eq!(reports[0].observations[0].display.price, "196.70");
    assert_eq!(store.load().get("MSFT"), Some(&3.0));

    // After a reset the next cycle bootstraps again, silently.
    assert_eq!(coord.reset_tracking().await, ResetOutcome::Cleared);
    assert!(!store.path().exists());
    assert_eq!(coord.reset_tracking().await, ResetOutcome::NothingToReset);

    assert_eq!(
        coord.run_cycle().await,
        CycleOutcome::Quiet {
            tracked: 2,
            persisted: true
        }
    );
    assert_eq!(notifier.count(), 1);
    assert_eq!(store.load().get("AAPL"), Some(&10.0));
    assert_eq!(source.fetch_count(), 3);

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn overlapping_cycle_is_skipped_not_queued() {
    let dir = scratch_dir();
    let gate = Gate::default();
    let source = Arc::new(
        ScriptedSource::repeating(vec![row("AAPL", "1.0%", "190.00")]).gated(gate.clone()),
    );
    let notifier = Arc::new(RecordingNotifier::new());
    let coord = Arc::new(coordinator(
        Arc::clone(&source),
        notifier,
        TrackingStore::new(dir.join("tracking.json")),
        DetectorConfig::default(),
    ));

    let first = tokio::spawn({
        let coord = Arc::clone(&coord);
        async move { coord.run_cycle().await }
    });

    // Wait until the first cycle is parked inside its fetch.
    gate.started.notified().await;
    assert!(coord.is_running());
    assert_eq!(coord.run_cycle().await, CycleOutcome::Skipped);

    gate.release.notify_one();
    let outcome = first.await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Quiet { tracked: 1, .. }));
    assert_eq!(source.fetch_count(), 1);
    assert!(!coord.is_running());

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn failed_fetch_leaves_tracking_untouched() {
    let dir = scratch_dir();
    let store = TrackingStore::new(dir.join("tracking.json"));
    let mut seeded = TrackingState::new();
    seeded.insert("AAPL".into(), 1.0);
    assert_ok!(store.save(&seeded));

    let source = Arc::new(ScriptedSource::new(vec![
        FetchResult::Failure("HTTP 503".into()),
        FetchResult::Empty,
    ]));
    let notifier = Arc::new(RecordingNotifier::new());
    let coord = coordinator(
        source,
        Arc::clone(&notifier),
        store.clone(),
        DetectorConfig::default(),
    );

    assert_eq!(
        coord.run_cycle().await,
        CycleOutcome::NoData {
            reason: "HTTP 503".into()
        }
    );
    assert!(matches!(coord.run_cycle().await, CycleOutcome::NoData { .. }));
    assert_eq!(store.load(), seeded);
    assert_eq!(notifier.count(), 0);

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn unwritable_store_keeps_running() {
    let dir = scratch_dir();
    let store = TrackingStore::new(dir.join("missing").join("tracking.json"));
    let source = Arc::new(ScriptedSource::repeating(vec![row("AAPL", "1.0%", "190.00")]));
    let notifier = Arc::new(RecordingNotifier::new());
    let coord = coordinator(
        source,
        Arc::clone(&notifier),
        store.clone(),
        DetectorConfig::default(),
    );

    for _ in 0..2 {
        assert_eq!(
            coord.run_cycle().await,
            CycleOutcome::Quiet {
                tracked: 1,
                persisted: false
            }
        );
    }
    assert!(store.load().is_empty());
    assert_eq!(notifier.count(), 0);

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn persist_failure_still_notifies() {
    let dir = scratch_dir();
    // Readable as-is, but the sibling temp name exceeds the file-name limit,
    // so every save fails.
    let store = TrackingStore::new(dir.join(format!("{}.json", "t".repeat(220))));
    std::fs::write(store.path(), r#"{"AAPL": 1.0}"#).unwrap();
    assert_eq!(store.load().get("AAPL"), Some(&1.0));

    let source = Arc::new(ScriptedSource::repeating(vec![row("AAPL", "5.0%", "198.00")]));
    let notifier = Arc::new(RecordingNotifier::new());
    let coord = coordinator(
        source,
        Arc::clone(&notifier),
        store.clone(),
        DetectorConfig::default(),
    );

    assert_eq!(
        coord.run_cycle().await,
        CycleOutcome::Notified {
            alerts: 1,
            tracked: 1,
            persisted: false,
            delivered: true
        }
    );
    let reports = notifier.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].decisions["AAPL"].delta, Some(4.0));
    assert_eq!(store.load().get("AAPL"), Some(&1.0));

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn delivery_failure_still_advances_tracking() {
    let dir = scratch_dir();
    let store = TrackingStore::new(dir.join("tracking.json"));
    let mut seeded = TrackingState::new();
    seeded.insert("NVDA".into(), 0.5);
    assert_ok!(store.save(&seeded));

    let source = Arc::new(ScriptedSource::repeating(vec![row("NVDA", "6.0%", "120.00")]));
    let notifier = Arc::new(RecordingNotifier::new());
    notifier.set_error("webhook returned HTTP 500");
    let coord = coordinator(
        source,
        Arc::clone(&notifier),
        store.clone(),
        DetectorConfig::default(),
    );

    assert_eq!(
        coord.run_cycle().await,
        CycleOutcome::Notified {
            alerts: 1,
            tracked: 1,
            persisted: true,
            delivered: false
        }
    );
    assert_eq!(store.load().get("NVDA"), Some(&6.0));

    // The same value is not re-announced on the next cycle.
    assert_eq!(
        coord.run_cycle().await,
        CycleOutcome::Quiet {
            tracked: 1,
            persisted: true
        }
    );
    assert_eq!(notifier.count(), 1);

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn announced_new_symbols_and_top_scope() {
    let dir = scratch_dir();
    let store = TrackingStore::new(dir.join("tracking.json"));
    let source = Arc::new(ScriptedSource::new(vec![
        FetchResult::Rows(vec![
            row("AAPL", "1.0%", "190.00"),
            row("MSFT", "0.5%", "410.00"),
            row("XOM", "-2.0%", "110.00"),
        ]),
        FetchResult::Rows(vec![
            row("AAPL", "1.5%", "191.00"),
            row("TSLA", "8.0%", "250.00"),
            row("XOM", "-1.0%", "111.00"),
        ]),
    ]));
    let notifier = Arc::new(RecordingNotifier::new());
    let config = DetectorConfig {
        scope: Scope::Top(2),
        policy: AlertPolicy {
            announce_new: true,
            ..AlertPolicy::default()
        },
    };
    let coord = coordinator(source, Arc::clone(&notifier), store.clone(), config);

    // Only the top two enter tracking.
    assert!(matches!(
        coord.run_cycle().await,
        CycleOutcome::Quiet { tracked: 2, .. }
    ));
    assert!(!store.load().contains_key("XOM"));

    assert!(matches!(
        coord.run_cycle().await,
        CycleOutcome::Notified { alerts: 1, .. }
    ));
    let report = &notifier.reports()[0];
    assert_eq!(report.decisions["TSLA"].classification, Classification::New);
    assert!(report.decisions["TSLA"].delta.is_none());

    // MSFT fell out of scope but is retained.
    let state = store.load();
    assert_eq!(state.get("MSFT"), Some(&0.5));
    assert_eq!(state.get("TSLA"), Some(&8.0));

    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn manual_and_forced_reports_ignore_tracking() {
    let dir = scratch_dir();
    let store = TrackingStore::new(dir.join("tracking.json"));
    let rows: Vec<_> = (0..8)
        .map(|i| row(&format!("T{i}"), &format!("{i}.0%"), "10.00"))
        .collect();
    let source = Arc::new(ScriptedSource::repeating(rows));
    let notifier = Arc::new(RecordingNotifier::new());
    let coord = coordinator(
        source,
        Arc::clone(&notifier),
        store.clone(),
        DetectorConfig::default(),
    )
    .with_manual_top_n(3);

    assert_eq!(
        coord.run_manual().await,
        CycleOutcome::Notified {
            alerts: 3,
            tracked: 0,
            persisted: false,
            delivered: true
        }
    );
    assert!(matches!(
        coord.run_forced().await,
        CycleOutcome::Notified { alerts: 3, .. }
    ));
    assert!(!store.path().exists());

    let reports = notifier.reports();
    let symbols: Vec<_> = reports[0]
        .observations
        .iter()
        .map(|o| o.symbol.as_str())
        .collect();
    assert_eq!(symbols, vec!["T7", "T6", "T5"]);
    assert_eq!(
        reports[1].decisions["T7"].classification,
        Classification::Forced
    );

    std::fs::remove_dir_all(dir).unwrap();
}
