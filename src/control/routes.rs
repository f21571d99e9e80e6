//! Control API route handlers.
//!
//! Each command endpoint calls one public coordinator operation and maps
//! its outcome to an HTTP status plus a user-facing message.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::coordinator::RunCoordinator;
use crate::types::{CycleOutcome, ResetOutcome};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ControlState {
    pub coordinator: Arc<RunCoordinator>,
    pub poll_interval_minutes: u64,
}

pub type AppState = Arc<ControlState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandResponse {
    /// `ok`, `skipped`, `no_data`, or `error`.
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked: Option<usize>,
}

impl CommandResponse {
    fn new(status: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            alerts: None,
            tracked: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub threshold: f64,
    pub poll_interval_minutes: u64,
    pub tracked_symbols: usize,
    pub tracking_file: String,
}

type CommandReply = (StatusCode, Json<CommandResponse>);

// ---------------------------------------------------------------------------
// Outcome mapping
// ---------------------------------------------------------------------------

/// Map a cycle outcome to a status code and message.
pub fn cycle_reply(outcome: CycleOutcome, threshold: f64, forced: bool) -> CommandReply {
    match outcome {
        CycleOutcome::Skipped => (
            StatusCode::CONFLICT,
            Json(CommandResponse::new(
                "skipped",
                "⏳ A check is already running, try again shortly.",
            )),
        ),
        CycleOutcome::NoData { reason } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CommandResponse::new(
                "no_data",
                format!("⚠️ Unable to fetch ticker data ({reason})."),
            )),
        ),
        CycleOutcome::Quiet { tracked, persisted } => {
            let mut message = format!("No significant changes (threshold: +{threshold}%).");
            if !persisted {
                message.push_str(" Tracking data could not be saved.");
            }
            let mut resp = CommandResponse::new("ok", message);
            resp.alerts = Some(0);
            resp.tracked = Some(tracked);
            (StatusCode::OK, Json(resp))
        }
        CycleOutcome::Notified {
            alerts,
            tracked,
            delivered,
            ..
        } => {
            let (code, status, message) = if !delivered {
                (
                    StatusCode::BAD_GATEWAY,
                    "error",
                    format!("❌ {alerts} ticker(s) selected but the report could not be delivered."),
                )
            } else if forced {
                (
                    StatusCode::OK,
                    "ok",
                    "🔧 **Forced Update** (threshold bypassed)".to_string(),
                )
            } else {
                (
                    StatusCode::OK,
                    "ok",
                    format!("Report sent! {alerts} ticker(s) included."),
                )
            };
            let mut resp = CommandResponse::new(status, message);
            resp.alerts = Some(alerts);
            if tracked > 0 {
                resp.tracked = Some(tracked);
            }
            (code, Json(resp))
        }
    }
}

/// Map a reset outcome to a status code and message.
pub fn reset_reply(outcome: ResetOutcome) -> CommandReply {
    match outcome {
        ResetOutcome::Cleared => (
            StatusCode::OK,
            Json(CommandResponse::new(
                "ok",
                "🔄 Tracking data reset. Next check will re-seed tracking without alerts.",
            )),
        ),
        ResetOutcome::NothingToReset => (
            StatusCode::OK,
            Json(CommandResponse::new("ok", "ℹ️ No tracking data to reset.")),
        ),
        ResetOutcome::Failed(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CommandResponse::new(
                "error",
                format!("❌ Could not reset tracking data: {reason}"),
            )),
        ),
    }
}

/// Command help text.
pub fn help_text(poll_interval_minutes: u64, threshold: f64) -> String {
    format!(
        "**🤖 Ticker Watch Commands:**\n\n\
         `POST /api/top` - Show current top performers (bypasses threshold)\n\
         `POST /api/force` - Force send notification (bypasses threshold)\n\
         `POST /api/cycle` - Run a tracked check now\n\
         `POST /api/reset` - Reset change tracking (next check re-seeds silently)\n\
         `GET /api/help` - Show this help message\n\n\
         **Auto-notifications:** checks every {poll_interval_minutes} minute(s) and only \
         sends alerts when a ticker's change increases by +{threshold}% or more."
    )
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/cycle
pub async fn post_cycle(State(state): State<AppState>) -> CommandReply {
    let coord = &state.coordinator;
    cycle_reply(coord.run_cycle().await, coord.threshold(), false)
}

/// POST /api/top
pub async fn post_top(State(state): State<AppState>) -> CommandReply {
    let coord = &state.coordinator;
    cycle_reply(coord.run_manual().await, coord.threshold(), false)
}

/// POST /api/force
pub async fn post_force(State(state): State<AppState>) -> CommandReply {
    let coord = &state.coordinator;
    cycle_reply(coord.run_forced().await, coord.threshold(), true)
}

/// POST /api/reset
pub async fn post_reset(State(state): State<AppState>) -> CommandReply {
    reset_reply(state.coordinator.reset_tracking().await)
}

/// GET /api/help
pub async fn get_help(State(state): State<AppState>) -> String {
    help_text(state.poll_interval_minutes, state.coordinator.threshold())
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let coord = &state.coordinator;
    Json(StatusResponse {
        running: coord.is_running(),
        threshold: coord.threshold(),
        poll_interval_minutes: state.poll_interval_minutes,
        tracked_symbols: coord.store().peek().len(),
        tracking_file: coord.store().path().display().to_string(),
    })
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
