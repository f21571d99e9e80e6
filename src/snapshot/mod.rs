//! Snapshot normalisation.
//!
//! Turns raw exported rows (header -> cell) into `TickerObservation`s with a
//! parsed numeric change, and ranks observations for top-N scopes.

use serde::Deserialize;

use crate::types::{DisplayFields, RawRow, TickerObservation};

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Header names to read from each raw row.
///
/// Defaults match the Finviz Elite screener export.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotColumns {
    pub symbol: String,
    /// Percentage column the detector tracks.
    pub change: String,
    pub price: String,
    pub perf_month: String,
    pub perf_ytd: String,
    pub earnings_date: String,
}

impl Default for SnapshotColumns {
    fn default() -> Self {
        Self {
            symbol: "Ticker".to_string(),
            change: "Change from Open".to_string(),
            price: "Price".to_string(),
            perf_month: "Performance (Month)".to_string(),
            perf_ytd: "Performance (YTD)".to_string(),
            earnings_date: "Earnings Date".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a percentage cell such as `"1.77%"` or `"1,234%"` into a number.
///
/// Empty cells, the `"-"` placeholder, missing cells, and anything that
/// does not parse to a finite number all yield `0.0`.
pub fn parse_percentage(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return 0.0;
    }

    let cleaned = trimmed.trim_end_matches('%').replace(',', "");
    match cleaned.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Normalise rows using the default Finviz column names.
pub fn normalize(rows: &[RawRow]) -> Vec<TickerObservation> {
    normalize_with(rows, &SnapshotColumns::default())
}

/// Normalise rows using an explicit column mapping.
///
/// Input order is preserved and duplicate symbols are kept. Rows without
/// a symbol are dropped.
pub fn normalize_with(rows: &[RawRow], columns: &SnapshotColumns) -> Vec<TickerObservation> {
    let cell = |row: &RawRow, name: &str| -> String {
        row.get(name).map(|s| s.trim().to_string()).unwrap_or_default()
    };

    rows.iter()
        .filter_map(|row| {
            let symbol = row.get(&columns.symbol)?.trim().to_uppercase();
            if symbol.is_empty() {
                return None;
            }

            let change_cell = row.get(&columns.change).map(String::as_str);
            Some(TickerObservation {
                symbol,
                numeric_change: parse_percentage(change_cell),
                display: DisplayFields {
                    price: cell(row, &columns.price),
                    change_from_open: cell(row, &columns.change),
                    perf_month: cell(row, &columns.perf_month),
                    perf_ytd: cell(row, &columns.perf_ytd),
                    earnings_date: cell(row, &columns.earnings_date),
                },
            })
        })
        .collect()
}

/// Top `n` observations by numeric change, highest first.
///
/// The sort is stable, so equal values keep their input order.
pub fn rank_top(observations: &[TickerObservation], n: usize) -> Vec<TickerObservation> {
    let mut ranked = observations.to_vec();
    ranked.sort_by(|a, b| {
        b.numeric_change
            .partial_cmp(&a.numeric_change)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
