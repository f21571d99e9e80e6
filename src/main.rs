//! TICKERWATCH — momentum alerts for a Finviz Elite screener.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the snapshot source, tracking store and notifier into a run
//! coordinator, optionally starts the control server, and runs the
//! periodic check loop until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use tickerwatch::alerts::discord::DiscordNotifier;
use tickerwatch::alerts::{LogNotifier, Notifier};
use tickerwatch::config;
use tickerwatch::control::{self, ControlState};
use tickerwatch::engine::coordinator::RunCoordinator;
use tickerwatch::engine::detector::ChangeDetector;
use tickerwatch::engine::scheduler;
use tickerwatch::provider::finviz::FinvizClient;
use tickerwatch::storage::TrackingStore;

/// Env var naming an alternative config file.
const CONFIG_PATH_ENV: &str = "TICKERWATCH_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".into());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    let detector_config = cfg.detector_config();
    info!(
        name = %cfg.watcher.name,
        poll_interval_minutes = cfg.watcher.poll_interval_minutes,
        threshold = cfg.watcher.change_threshold,
        scope = ?detector_config.scope,
        announce_new = detector_config.policy.announce_new,
        retain_missing = detector_config.policy.retain_missing,
        tracking_file = %cfg.watcher.tracking_file,
        "TICKERWATCH starting up"
    );

    // -- Initialise components -------------------------------------------

    let source = Arc::new(FinvizClient::from_config(&cfg.provider)?);

    let notifier: Arc<dyn Notifier> = match DiscordNotifier::from_config(&cfg.alerts, &cfg.news)? {
        Some(discord) => {
            info!("Delivering alerts to Discord webhook");
            Arc::new(discord)
        }
        None => {
            warn!("No webhook configured, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let coordinator = Arc::new(
        RunCoordinator::new(
            source,
            TrackingStore::new(&cfg.watcher.tracking_file),
            notifier,
            ChangeDetector::new(detector_config),
            cfg.watcher.change_threshold,
        )
        .with_columns(cfg.provider.columns.clone())
        .with_manual_top_n(cfg.watcher.manual_top_n),
    );

    if cfg.control.enabled {
        let state = Arc::new(ControlState {
            coordinator: Arc::clone(&coordinator),
            poll_interval_minutes: cfg.watcher.poll_interval_minutes,
        });
        control::spawn_control(state, cfg.control.port).await?;
    }

    // -- Main loop -------------------------------------------------------

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C; running until killed");
            std::future::pending::<()>().await;
        }
    };

    scheduler::run(coordinator, cfg.poll_interval(), shutdown).await;

    info!("TICKERWATCH shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tickerwatch=info"));

    let json_logging = std::env::var("TICKERWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
