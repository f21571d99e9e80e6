//! Persistence layer.
//!
//! Saves and loads the per-symbol tracking state to/from a JSON file.
//! Saves go through a sibling temp file and a rename so that a reader
//! never observes a half-written file. Loads never fail: a missing or
//! corrupt file is treated as "no history".

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::{TrackingState, WatchError};

/// Default tracking file path.
pub const DEFAULT_TRACKING_FILE: &str = "ticker_tracking.json";

/// File-backed store for `TrackingState`.
#[derive(Debug, Clone)]
pub struct TrackingStore {
    path: PathBuf,
}

impl TrackingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the tracking state.
    ///
    /// Returns an empty state if the file is absent, unreadable, or not a
    /// JSON object of symbol -> number.
    pub fn load(&self) -> TrackingState {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No tracking data found, starting fresh");
            return TrackingState::new();
        }

        match self.read_state() {
            Ok(state) => {
                debug!(path = %self.path.display(), symbols = state.len(), "Tracking data loaded");
                state
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %format!("{e:#}"),
                    "Tracking data unreadable, treating as empty"
                );
                TrackingState::new()
            }
        }
    }

    /// Read the tracking state without logging, for status queries.
    ///
    /// Same fallbacks as `load`: missing or unreadable yields empty.
    pub fn peek(&self) -> TrackingState {
        if !self.path.exists() {
            return TrackingState::new();
        }
        self.read_state().unwrap_or_default()
    }

    fn read_state(&self) -> Result<TrackingState> {
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let state: TrackingState = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(state)
    }

    /// Replace the persisted state with `state`.
    pub fn save(&self, state: &TrackingState) -> Result<(), WatchError> {
        self.write_atomic(state).map_err(|e| WatchError::Persist {
            path: self.path.display().to_string(),
            message: format!("{e:#}"),
        })?;

        debug!(path = %self.path.display(), symbols = state.len(), "Tracking data saved");
        Ok(())
    }

    fn write_atomic(&self, state: &TrackingState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .context("Failed to serialise tracking state")?;

        let tmp = self.temp_path();
        let written = (|| -> Result<()> {
            let mut file = std::fs::File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            file.write_all(json.as_bytes())
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
            file.sync_all()
                .with_context(|| format!("Failed to sync {}", tmp.display()))?;
            std::fs::rename(&tmp, &self.path).with_context(|| {
                format!("Failed to rename {} over {}", tmp.display(), self.path.display())
            })?;
            Ok(())
        })();

        if written.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        written
    }

    /// Sibling temp path so the final rename stays on one filesystem.
    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_TRACKING_FILE.to_string());
        self.path
            .with_file_name(format!("{file_name}.{}.tmp", uuid::Uuid::new_v4()))
    }

    /// Delete the persisted state. Returns whether a file existed.
    pub fn reset(&self) -> Result<bool, WatchError> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path).map_err(|e| {
            WatchError::Storage(format!("Failed to delete {}: {e}", self.path.display()))
        })?;
        info!(path = %self.path.display(), "Tracking data reset");
        Ok(true)
    }
}

impl Default for TrackingStore {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKING_FILE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
