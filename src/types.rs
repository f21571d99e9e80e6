//! Core domain types for TICKERWATCH.
//!
//! Snapshot observations, persisted tracking state, detector decisions,
//! the report handed to notifiers, and the cycle outcome types returned
//! to administrative callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Snapshot observations
// ---------------------------------------------------------------------------

/// Display-only columns carried through from the screener export.
///
/// None of these participate in change detection; they are passed
/// verbatim to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayFields {
    pub price: String,
    pub change_from_open: String,
    pub perf_month: String,
    pub perf_ytd: String,
    pub earnings_date: String,
}

/// One row of a snapshot with its change column parsed to a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerObservation {
    /// Uppercase ticker code (e.g. "AAPL").
    pub symbol: String,
    /// Percentage change as a plain number: 1.77 for "1.77%".
    pub numeric_change: f64,
    #[serde(default)]
    pub display: DisplayFields,
}

impl TickerObservation {
    pub fn new(symbol: impl Into<String>, numeric_change: f64) -> Self {
        Self {
            symbol: symbol.into(),
            numeric_change,
            display: DisplayFields::default(),
        }
    }

    pub fn with_display(mut self, display: DisplayFields) -> Self {
        self.display = display;
        self
    }
}

// ---------------------------------------------------------------------------
// Tracking state
// ---------------------------------------------------------------------------

/// Last observed numeric change per symbol, persisted across cycles.
///
/// A `BTreeMap` keeps the on-disk JSON in stable key order.
pub type TrackingState = BTreeMap<String, f64>;

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why a symbol appears in a decision set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// First time this symbol has been seen (only when announced).
    New,
    /// Rose by at least the configured threshold since last observation.
    Threshold,
    /// Tracked, but moved less than the threshold (or fell).
    UnchangedBelowThreshold,
    /// On-demand top-N report.
    Manual,
    /// Administrative forced report.
    Forced,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::New => write!(f, "NEW"),
            Classification::Threshold => write!(f, "THRESHOLD"),
            Classification::UnchangedBelowThreshold => write!(f, "UNCHANGED_BELOW_THRESHOLD"),
            Classification::Manual => write!(f, "MANUAL"),
            Classification::Forced => write!(f, "FORCED"),
        }
    }
}

/// Per-symbol detector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub symbol: String,
    pub classification: Classification,
    /// `current_value - previous_value`; present only with a previous value.
    pub delta: Option<f64>,
    pub previous_value: Option<f64>,
    pub current_value: f64,
}

impl Decision {
    /// Decision for a symbol with history.
    pub fn tracked(
        symbol: impl Into<String>,
        classification: Classification,
        previous_value: f64,
        current_value: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            classification,
            delta: Some(current_value - previous_value),
            previous_value: Some(previous_value),
            current_value,
        }
    }

    /// Decision with no history (new, manual, forced).
    pub fn untracked(
        symbol: impl Into<String>,
        classification: Classification,
        current_value: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            classification,
            delta: None,
            previous_value: None,
            current_value,
        }
    }

    /// Whether this decision should be shown as an alert.
    pub fn is_alert(&self) -> bool {
        self.classification != Classification::UnchangedBelowThreshold
    }
}

/// Decisions for one cycle, keyed by symbol.
pub type DecisionSet = BTreeMap<String, Decision>;

/// Order decisions for display: biggest delta first, then biggest current
/// value for decisions without a delta. Ties fall back to symbol order.
pub fn rank_decisions(decisions: &DecisionSet) -> Vec<&Decision> {
    let mut ranked: Vec<&Decision> = decisions.values().collect();
    ranked.sort_by(|a, b| {
        let key_a = a.delta.unwrap_or(f64::NEG_INFINITY);
        let key_b = b.delta.unwrap_or(f64::NEG_INFINITY);
        key_b
            .partial_cmp(&key_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.current_value
                    .partial_cmp(&a.current_value)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    ranked
}

// ---------------------------------------------------------------------------
// Notifier payload
// ---------------------------------------------------------------------------

/// What triggered a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Scheduled (or manually triggered) tracked cycle.
    Alert,
    Manual,
    Forced,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Alert => write!(f, "alert"),
            ReportKind::Manual => write!(f, "manual"),
            ReportKind::Forced => write!(f, "forced"),
        }
    }
}

/// Everything a notifier needs to render and deliver one message.
#[derive(Debug, Clone)]
pub struct AlertReport {
    pub kind: ReportKind,
    pub decisions: DecisionSet,
    /// Snapshot rows for the symbols in `decisions`, in display order.
    pub observations: Vec<TickerObservation>,
    pub threshold: f64,
    pub generated_at: DateTime<Utc>,
}

impl AlertReport {
    /// Build a report, keeping only the observations that have a decision
    /// and ordering them by `rank_decisions`.
    pub fn new(
        kind: ReportKind,
        decisions: DecisionSet,
        observations: &[TickerObservation],
        threshold: f64,
    ) -> Self {
        let mut ordered = Vec::with_capacity(decisions.len());
        for decision in rank_decisions(&decisions) {
            // Last occurrence wins, matching the detector's duplicate rule.
            if let Some(obs) = observations
                .iter()
                .rev()
                .find(|o| o.symbol == decision.symbol)
            {
                ordered.push(obs.clone());
            }
        }

        Self {
            kind,
            decisions,
            observations: ordered,
            threshold,
            generated_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Fetch and cycle outcomes
// ---------------------------------------------------------------------------

/// Raw header -> cell mapping for one exported row.
pub type RawRow = BTreeMap<String, String>;

/// Result of one call to the snapshot source.
#[derive(Debug, Clone)]
pub enum FetchResult {
    Rows(Vec<RawRow>),
    Empty,
    Failure(String),
}

impl FetchResult {
    /// Collapse an empty row set into `Empty`.
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        if rows.is_empty() {
            FetchResult::Empty
        } else {
            FetchResult::Rows(rows)
        }
    }
}

/// Result of `RunCoordinator::run_cycle` and the on-demand report paths.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Another cycle held the run lock; nothing was fetched.
    Skipped,
    /// Fetch failed or returned nothing; tracking state untouched.
    NoData { reason: String },
    /// Cycle completed with nothing to report.
    Quiet { tracked: usize, persisted: bool },
    /// A report was handed to the notifier.
    Notified {
        alerts: usize,
        tracked: usize,
        persisted: bool,
        delivered: bool,
    },
}

/// Result of `RunCoordinator::reset_tracking`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResetOutcome {
    Cleared,
    NothingToReset,
    Failed(String),
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for TICKERWATCH.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Fetch error ({source_name}): {message}")]
    Fetch { source_name: String, message: String },

    #[error("Failed to persist tracking state to {path}: {message}")]
    Persist { path: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Delivery error ({channel}): {message}")]
    Delivery { channel: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
