//! Run coordinator.
//!
//! Owns the run lock and sequences one fetch → detect → persist → notify
//! cycle. At most one tracked cycle runs at a time: a cycle that finds the
//! lock taken is skipped, not queued. Manual and forced reports never touch
//! tracking state and therefore bypass the lock; resets wait for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::detector::ChangeDetector;
use crate::alerts::Notifier;
use crate::provider::SnapshotSource;
use crate::snapshot::{normalize_with, SnapshotColumns};
use crate::storage::TrackingStore;
use crate::types::{
    AlertReport, Classification, CycleOutcome, FetchResult, RawRow, ReportKind, ResetOutcome,
    TickerObservation,
};

/// Default size of manual / forced reports.
const DEFAULT_MANUAL_TOP_N: usize = 5;

pub struct RunCoordinator {
    source: Arc<dyn SnapshotSource>,
    store: TrackingStore,
    notifier: Arc<dyn Notifier>,
    detector: ChangeDetector,
    columns: SnapshotColumns,
    threshold: f64,
    manual_top_n: usize,
    run_lock: Mutex<()>,
    running: AtomicBool,
}

/// Clears the running flag when the lock holder finishes.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl RunCoordinator {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: TrackingStore,
        notifier: Arc<dyn Notifier>,
        detector: ChangeDetector,
        threshold: f64,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            detector,
            columns: SnapshotColumns::default(),
            threshold,
            manual_top_n: DEFAULT_MANUAL_TOP_N,
            run_lock: Mutex::new(()),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_columns(mut self, columns: SnapshotColumns) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_manual_top_n(mut self, n: usize) -> Self {
        self.manual_top_n = n;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    /// Whether a tracked cycle (or reset) currently holds the run lock.
    ///
    /// Reads a flag only; never contends for the lock itself.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one tracked cycle, or skip if another one is in progress.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_guard) = self.run_lock.try_lock() else {
            info!("Previous cycle still running, skipping this tick");
            return CycleOutcome::Skipped;
        };
        let _running = RunningFlag::raise(&self.running);

        info!(source = self.source.name(), "Starting scheduled check");

        let observations = match self.fetch_observations().await {
            Ok(obs) => obs,
            Err(reason) => return CycleOutcome::NoData { reason },
        };

        let previous = self.store.load();
        let detection = self
            .detector
            .detect(&observations, &previous, self.threshold);
        let tracked = detection.next_state.len();
        let alerts = detection.alert_count();

        // Persist before notifying: a crash after this point loses at most
        // one message, never history.
        let persisted = match self.store.save(&detection.next_state) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to save tracking data; next cycle will compare against stale values");
                false
            }
        };

        // Unchanged entries only ride along with a real alert.
        if alerts == 0 {
            info!(
                tracked,
                threshold = self.threshold,
                "No significant increases"
            );
            return CycleOutcome::Quiet { tracked, persisted };
        }

        let report = AlertReport::new(
            ReportKind::Alert,
            detection.decisions,
            &observations,
            self.threshold,
        );
        let delivered = self.deliver(&report).await;

        info!(alerts, tracked, persisted, delivered, "Cycle complete");
        CycleOutcome::Notified {
            alerts,
            tracked,
            persisted,
            delivered,
        }
    }

    /// On-demand top-N report. Ignores the threshold and tracking state.
    pub async fn run_manual(&self) -> CycleOutcome {
        self.run_bypass(ReportKind::Manual, Classification::Manual)
            .await
    }

    /// Administrative forced report. Ignores the threshold and tracking state.
    pub async fn run_forced(&self) -> CycleOutcome {
        self.run_bypass(ReportKind::Forced, Classification::Forced)
            .await
    }

    async fn run_bypass(&self, kind: ReportKind, classification: Classification) -> CycleOutcome {
        info!(%kind, top_n = self.manual_top_n, "Running on-demand report");

        let observations = match self.fetch_observations().await {
            Ok(obs) => obs,
            Err(reason) => return CycleOutcome::NoData { reason },
        };

        let decisions = ChangeDetector::bypass(&observations, self.manual_top_n, classification);
        let alerts = decisions.len();
        let report = AlertReport::new(kind, decisions, &observations, self.threshold);
        let delivered = self.deliver(&report).await;

        CycleOutcome::Notified {
            alerts,
            tracked: 0,
            persisted: false,
            delivered,
        }
    }

    /// Delete tracking state so the next cycle bootstraps silently.
    ///
    /// Waits for an in-flight cycle to finish rather than skipping.
    pub async fn reset_tracking(&self) -> ResetOutcome {
        let _guard = self.run_lock.lock().await;
        let _running = RunningFlag::raise(&self.running);
        match self.store.reset() {
            Ok(true) => ResetOutcome::Cleared,
            Ok(false) => ResetOutcome::NothingToReset,
            Err(e) => {
                error!(error = %e, "Failed to reset tracking data");
                ResetOutcome::Failed(e.to_string())
            }
        }
    }

    async fn fetch_observations(&self) -> Result<Vec<TickerObservation>, String> {
        let rows: Vec<RawRow> = match self.source.fetch().await {
            FetchResult::Rows(rows) => rows,
            FetchResult::Empty => {
                warn!(source = self.source.name(), "Unable to fetch ticker data: empty snapshot");
                return Err("snapshot was empty".to_string());
            }
            FetchResult::Failure(reason) => {
                warn!(source = self.source.name(), reason = %reason, "Unable to fetch ticker data");
                return Err(reason);
            }
        };

        let observations = normalize_with(&rows, &self.columns);
        if observations.is_empty() {
            warn!(rows = rows.len(), "Snapshot had no rows with a ticker symbol");
            return Err("snapshot had no usable rows".to_string());
        }
        Ok(observations)
    }

    async fn deliver(&self, report: &AlertReport) -> bool {
        match self.notifier.send(report).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    notifier = self.notifier.name(),
                    error = %format!("{e:#}"),
                    "Failed to deliver report"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
