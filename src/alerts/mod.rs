//! Alert delivery.
//!
//! Defines the `Notifier` trait and provides:
//! - `DiscordNotifier`: renders an embed and posts it to a webhook
//! - `LogNotifier`: dry-run delivery that only writes to the log

pub mod discord;
pub mod render;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::types::{rank_decisions, AlertReport};

/// Abstraction over alert delivery channels.
///
/// The engine hands over a fully decided report and does not retry;
/// formatting and transport are entirely the notifier's business.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Render and deliver one report.
    async fn send(&self, report: &AlertReport) -> Result<()>;

    /// Channel name for logging and identification.
    fn name(&self) -> &'static str;
}

/// Notifier used when no delivery channel is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, report: &AlertReport) -> Result<()> {
        info!(
            kind = %report.kind,
            count = report.len(),
            threshold = report.threshold,
            "[DRY RUN] Would send report"
        );
        for decision in rank_decisions(&report.decisions) {
            info!(
                symbol = %decision.symbol,
                classification = %decision.classification,
                current = decision.current_value,
                previous = ?decision.previous_value,
                delta = ?decision.delta,
                "[DRY RUN] Report entry"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
