//! Ticker news side file.
//!
//! Reads a CSV of headlines (`symbol,title,summary,source,link,date`) that
//! an external scraper keeps up to date, and serves the latest items per
//! ticker for alert enrichment. The file is re-read for every report so
//! fresh headlines show up without a restart.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// One headline ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub link: String,
    pub published: DateTime<Utc>,
}

impl NewsItem {
    /// Publication time in the `2024-01-05 14:30 UTC` display format.
    pub fn display_date(&self) -> String {
        self.published.format("%Y-%m-%d %H:%M UTC").to_string()
    }
}

#[derive(Debug, Deserialize)]
struct NewsRecord {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Headlines grouped by uppercase symbol.
#[derive(Debug, Clone, Default)]
pub struct NewsIndex {
    by_symbol: HashMap<String, Vec<NewsItem>>,
}

impl NewsIndex {
    /// Load and index a news CSV.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open news file {}", path.display()))?;

        let mut index = Self::default();
        let mut skipped = 0usize;
        for record in reader.deserialize::<NewsRecord>() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    debug!(error = %e, "Skipping malformed news row");
                    skipped += 1;
                    continue;
                }
            };
            if !index.insert(record) {
                skipped += 1;
            }
        }

        debug!(
            path = %path.display(),
            symbols = index.by_symbol.len(),
            skipped,
            "News file indexed"
        );
        Ok(index)
    }

    /// Load a news CSV, falling back to an empty index on any error.
    pub fn load_or_empty(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "News unavailable, continuing without");
            Self::default()
        })
    }

    fn insert(&mut self, record: NewsRecord) -> bool {
        let Some(symbol) = non_empty(record.symbol) else {
            return false;
        };
        let Some(published) = record.date.as_deref().and_then(parse_news_date) else {
            return false;
        };

        let item = NewsItem {
            title: non_empty(record.title).unwrap_or_else(|| "No title available".into()),
            summary: non_empty(record.summary).unwrap_or_else(|| "No summary available".into()),
            source: non_empty(record.source).unwrap_or_else(|| "Unknown".into()),
            link: non_empty(record.link).unwrap_or_else(|| "#".into()),
            published,
        };
        self.by_symbol
            .entry(symbol.to_uppercase())
            .or_default()
            .push(item);
        true
    }

    /// Most recent `count` items for `symbol`, newest first.
    pub fn latest(&self, symbol: &str, count: usize) -> Vec<NewsItem> {
        let Some(items) = self.by_symbol.get(&symbol.to_uppercase()) else {
            return Vec::new();
        };
        let mut items = items.clone();
        items.sort_by(|a, b| b.published.cmp(&a.published));
        items.truncate(count);
        items
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, and bare dates (UTC assumed).
fn parse_news_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
