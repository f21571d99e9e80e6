//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (auth token, webhook URL) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`. A couple of tuning
//! knobs can be overridden directly from the environment.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::detector::{AlertPolicy, DetectorConfig, Scope};
use crate::snapshot::SnapshotColumns;
use crate::types::WatchError;

/// Env var overriding `watcher.change_threshold`.
pub const THRESHOLD_ENV: &str = "CHANGE_THRESHOLD";
/// Env var overriding `watcher.poll_interval_minutes`.
pub const INTERVAL_ENV: &str = "UPDATE_INTERVAL_MINUTES";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub detector: DetectorSection,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatcherConfig {
    pub name: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u64,
    /// Minimum rise (in percentage points) between two observations.
    #[serde(default = "default_threshold")]
    pub change_threshold: f64,
    #[serde(default = "default_tracking_file")]
    pub tracking_file: String,
    /// How many tickers the manual / forced reports show.
    #[serde(default = "default_top_n")]
    pub manual_top_n: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    #[default]
    All,
    Top,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectorSection {
    #[serde(default)]
    pub scope: ScopeKind,
    /// Size of the ranked subset when `scope = "top"`.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(flatten)]
    pub policy: AlertPolicy,
}

impl Default for DetectorSection {
    fn default() -> Self {
        Self {
            scope: ScopeKind::All,
            top_n: default_top_n(),
            policy: AlertPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_export_url")]
    pub export_url: String,
    /// Screener query string (filters, ordering, column list) without auth.
    #[serde(default = "default_screener_query")]
    pub screener_query: String,
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub columns: SnapshotColumns,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            export_url: default_export_url(),
            screener_query: default_screener_query(),
            auth_token_env: default_auth_token_env(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            columns: SnapshotColumns::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertsConfig {
    /// Env var holding the Discord webhook URL. Unset → log-only delivery.
    #[serde(default)]
    pub discord_webhook_env: Option<String>,
    /// Maximum tickers rendered into a single alert.
    #[serde(default = "default_top_n")]
    pub max_fields: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            discord_webhook_env: None,
            max_fields: default_top_n(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewsConfig {
    /// CSV side file with `symbol,title,summary,source,link,date` columns.
    #[serde(default)]
    pub csv_path: Option<String>,
    #[serde(default = "default_news_items")]
    pub items_per_ticker: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            items_per_ticker: default_news_items(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_control_port")]
    pub port: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_control_port(),
        }
    }
}

fn default_poll_interval() -> u64 {
    1
}

fn default_threshold() -> f64 {
    3.0
}

fn default_tracking_file() -> String {
    crate::storage::DEFAULT_TRACKING_FILE.to_string()
}

fn default_top_n() -> usize {
    5
}

fn default_export_url() -> String {
    "https://elite.finviz.com/export.ashx".to_string()
}

fn default_screener_query() -> String {
    "v=152&ft=4&o=ticker&c=1,3,4,5,6,65,66,68,71,72,81".to_string()
}

fn default_auth_token_env() -> String {
    "FINVIZ_AUTH_TOKEN".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_news_items() -> usize {
    3
}

fn default_control_port() -> u16 {
    8080
}

impl AppConfig {
    /// Load configuration from a TOML file, apply env overrides, validate.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no overrides, no validation).
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Apply `CHANGE_THRESHOLD` / `UPDATE_INTERVAL_MINUTES` if set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(THRESHOLD_ENV) {
            self.watcher.change_threshold = raw
                .trim()
                .parse()
                .with_context(|| format!("{THRESHOLD_ENV} is not a number: {raw}"))?;
        }
        if let Ok(raw) = std::env::var(INTERVAL_ENV) {
            self.watcher.poll_interval_minutes = raw
                .trim()
                .parse()
                .with_context(|| format!("{INTERVAL_ENV} is not an integer: {raw}"))?;
        }
        Ok(())
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.watcher.poll_interval_minutes < 1 {
            return Err(WatchError::Config(
                "poll_interval_minutes must be at least 1".into(),
            ));
        }
        let threshold = self.watcher.change_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(WatchError::Config(format!(
                "change_threshold must be a positive number, got {threshold}"
            )));
        }
        if self.watcher.manual_top_n == 0 {
            return Err(WatchError::Config("manual_top_n must be at least 1".into()));
        }
        if self.detector.scope == ScopeKind::Top && self.detector.top_n == 0 {
            return Err(WatchError::Config(
                "detector.top_n must be at least 1 when scope = \"top\"".into(),
            ));
        }
        if self.alerts.max_fields == 0 {
            return Err(WatchError::Config("alerts.max_fields must be at least 1".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.watcher.poll_interval_minutes * 60)
    }

    pub fn detector_config(&self) -> DetectorConfig {
        let scope = match self.detector.scope {
            ScopeKind::All => Scope::All,
            ScopeKind::Top => Scope::Top(self.detector.top_n),
        };
        DetectorConfig {
            scope,
            policy: self.detector.policy,
        }
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
