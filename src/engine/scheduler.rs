//! Periodic scheduler.
//!
//! Fires `RunCoordinator::run_cycle` on a fixed interval. Each tick runs on
//! its own task, so a cycle that outlives the interval makes the following
//! ticks hit the busy run lock and get skipped instead of piling up.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::coordinator::RunCoordinator;
use crate::types::CycleOutcome;

/// Drive cycles every `period` until `shutdown` resolves.
///
/// The first cycle fires immediately. On shutdown, an in-flight cycle is
/// allowed to finish so its state write is not cut short.
pub async fn run<F>(coordinator: Arc<RunCoordinator>, period: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut cycles: JoinSet<CycleOutcome> = JoinSet::new();

    info!(
        interval_secs = period.as_secs(),
        threshold = coordinator.threshold(),
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let coordinator = Arc::clone(&coordinator);
                cycles.spawn(async move { coordinator.run_cycle().await });
            }
            Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                match joined {
                    Ok(outcome) => log_outcome(&outcome),
                    Err(e) => error!(error = %e, "Cycle task panicked, continuing to next"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    while let Some(joined) = cycles.join_next().await {
        match joined {
            Ok(outcome) => log_outcome(&outcome),
            Err(e) => error!(error = %e, "Cycle task failed during shutdown"),
        }
    }
}

/// Log a one-line cycle summary.
pub fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Skipped => debug!("Tick skipped"),
        CycleOutcome::NoData { reason } => warn!(reason = %reason, "Cycle ended without data"),
        CycleOutcome::Quiet { tracked, persisted } => {
            info!(tracked, persisted, "Cycle complete, nothing to report")
        }
        CycleOutcome::Notified {
            alerts,
            tracked,
            persisted,
            delivered,
        } => info!(alerts, tracked, persisted, delivered, "Cycle complete, report sent"),
    }
}
