//! In-memory collaborators for integration testing.
//!
//! Provides a scripted `SnapshotSource` that can be held mid-fetch and a
//! `Notifier` that records every report it receives. Both are fully
//! controllable from test code with no network access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use tickerwatch::alerts::Notifier;
use tickerwatch::provider::SnapshotSource;
use tickerwatch::types::{AlertReport, FetchResult, RawRow};

/// Build one export row the way the Finviz CSV presents it.
pub fn row(symbol: &str, change: &str, price: &str) -> RawRow {
    let mut row = RawRow::new();
    row.insert("Ticker".to_string(), symbol.to_string());
    row.insert("Change from Open".to_string(), change.to_string());
    row.insert("Price".to_string(), price.to_string());
    row
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tickerwatch_it_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Scripted snapshot source.
///
/// Serves queued results in order and repeats the last one once the queue
/// runs dry. When gated, the first fetch signals `started` and then waits
/// for `release` before returning.
pub struct ScriptedSource {
    script: Mutex<VecDeque<FetchResult>>,
    last: Mutex<FetchResult>,
    fetches: AtomicUsize,
    gate: Option<Gate>,
}

#[derive(Clone, Default)]
pub struct Gate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl ScriptedSource {
    pub fn new(script: Vec<FetchResult>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(FetchResult::Empty),
            fetches: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Always serve the same rows.
    pub fn repeating(rows: Vec<RawRow>) -> Self {
        Self::new(vec![FetchResult::Rows(rows)])
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch(&self) -> FetchResult {
        let earlier = self.fetches.fetch_add(1, Ordering::SeqCst);

        if let (Some(gate), 0) = (&self.gate, earlier) {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(result) = next {
            *last = result;
        }
        last.clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Notifier that keeps every report it is given.
#[derive(Default)]
pub struct RecordingNotifier {
    reports: Mutex<Vec<AlertReport>>,
    /// If set, every send fails with this message (after recording).
    fail_with: Mutex<Option<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, msg: &str) {
        *self.fail_with.lock().unwrap() = Some(msg.to_string());
    }

    pub fn reports(&self) -> Vec<AlertReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, report: &AlertReport) -> Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        match self.fail_with.lock().unwrap().as_ref() {
            Some(msg) => Err(anyhow!("{msg}")),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
