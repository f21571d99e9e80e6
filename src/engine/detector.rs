//! Change detector.
//!
//! Compares a snapshot against the previously tracked values and decides
//! which symbols are worth announcing. One detector covers both bot
//! flavours: a ranked top-N watcher and a full-universe watcher, selected
//! by `Scope`, with `AlertPolicy` controlling which classifications are
//! surfaced.

use serde::Deserialize;
use tracing::{debug, info};

use crate::snapshot::rank_top;
use crate::types::{Classification, Decision, DecisionSet, TickerObservation, TrackingState};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which observations the detector considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every symbol in the snapshot.
    All,
    /// Only the top `n` symbols by current change.
    Top(usize),
}

/// Which classifications produce a decision, and what happens to symbols
/// that drop out of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
    /// Emit `New` for symbols seen for the first time (after bootstrap).
    pub announce_new: bool,
    /// Emit `UnchangedBelowThreshold` for tracked symbols that did not cross.
    pub report_unchanged: bool,
    /// Keep tracked values for symbols missing from the current snapshot.
    pub retain_missing: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            announce_new: false,
            report_unchanged: false,
            retain_missing: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub scope: Scope,
    pub policy: AlertPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            scope: Scope::All,
            policy: AlertPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Output of one detection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub decisions: DecisionSet,
    /// State to persist for the next cycle.
    pub next_state: TrackingState,
}

impl Detection {
    /// Number of decisions that should be shown as alerts.
    pub fn alert_count(&self) -> usize {
        self.decisions.values().filter(|d| d.is_alert()).count()
    }
}

/// Stateless threshold-crossing detector.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    config: DetectorConfig,
}

impl ChangeDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Classify `observations` against `previous`.
    ///
    /// - Empty `previous`: silent bootstrap, every observed symbol is
    ///   tracked and no decisions are produced.
    /// - Tracked symbol: the tracked value always advances; a `Threshold`
    ///   decision is produced when `current - previous >= threshold`.
    /// - Untracked symbol: tracked silently unless `announce_new` is set.
    /// - Symbols missing from `observations` are carried over when
    ///   `retain_missing` is set.
    ///
    /// With duplicate symbols, the later observation wins.
    pub fn detect(
        &self,
        observations: &[TickerObservation],
        previous: &TrackingState,
        threshold: f64,
    ) -> Detection {
        if observations.is_empty() {
            return Detection {
                decisions: DecisionSet::new(),
                next_state: previous.clone(),
            };
        }

        let scoped;
        let observations = match self.config.scope {
            Scope::All => observations,
            Scope::Top(n) => {
                scoped = rank_top(observations, n);
                scoped.as_slice()
            }
        };

        if previous.is_empty() {
            let next_state: TrackingState = observations
                .iter()
                .map(|o| (o.symbol.clone(), o.numeric_change))
                .collect();
            info!(symbols = next_state.len(), "First run - tracking all tickers silently");
            return Detection {
                decisions: DecisionSet::new(),
                next_state,
            };
        }

        let policy = self.config.policy;
        let mut next_state = if policy.retain_missing {
            previous.clone()
        } else {
            TrackingState::new()
        };
        let mut decisions = DecisionSet::new();

        for obs in observations {
            let current = obs.numeric_change;
            next_state.insert(obs.symbol.clone(), current);

            let Some(&prior) = previous.get(&obs.symbol) else {
                if policy.announce_new {
                    debug!(symbol = %obs.symbol, current, "New symbol");
                    decisions.insert(
                        obs.symbol.clone(),
                        Decision::untracked(&obs.symbol, Classification::New, current),
                    );
                } else {
                    // A duplicate may have produced a decision we now supersede.
                    decisions.remove(&obs.symbol);
                }
                continue;
            };

            let delta = current - prior;
            if delta >= threshold {
                info!(
                    symbol = %obs.symbol,
                    previous = prior,
                    current,
                    delta = format!("{delta:.2}"),
                    threshold,
                    "Threshold crossed"
                );
                decisions.insert(
                    obs.symbol.clone(),
                    Decision::tracked(&obs.symbol, Classification::Threshold, prior, current),
                );
            } else if policy.report_unchanged {
                decisions.insert(
                    obs.symbol.clone(),
                    Decision::tracked(
                        &obs.symbol,
                        Classification::UnchangedBelowThreshold,
                        prior,
                        current,
                    ),
                );
            } else {
                decisions.remove(&obs.symbol);
            }
        }

        debug!(
            observed = observations.len(),
            tracked = next_state.len(),
            decisions = decisions.len(),
            "Detection complete"
        );

        Detection {
            decisions,
            next_state,
        }
    }

    /// Wrap the top `n` observations in `Manual` / `Forced` decisions.
    ///
    /// Tracking state is neither read nor produced.
    pub fn bypass(
        observations: &[TickerObservation],
        n: usize,
        classification: Classification,
    ) -> DecisionSet {
        rank_top(observations, n)
            .into_iter()
            .map(|o| {
                let decision = Decision::untracked(&o.symbol, classification, o.numeric_change);
                (o.symbol, decision)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
