//! Discord webhook delivery.
//!
//! Renders the report into an embed (with headlines from the news side
//! file, if configured) and POSTs it to the channel webhook.
//!
//! API: `POST {webhook_url}` with `{content?, embeds: [...]}`.
//! Auth: the webhook URL itself is the credential; it is never logged.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use super::render::{render_report, RenderOptions};
use super::Notifier;
use crate::config::{AlertsConfig, AppConfig, NewsConfig};
use crate::news::NewsIndex;
use crate::types::{AlertReport, WatchError};

const CHANNEL_NAME: &str = "discord";
const REQUEST_TIMEOUT_SECS: u64 = 15;

pub struct DiscordNotifier {
    http: Client,
    webhook_url: SecretString,
    news_path: Option<PathBuf>,
    options: RenderOptions,
}

impl DiscordNotifier {
    pub fn new(
        webhook_url: SecretString,
        news_path: Option<PathBuf>,
        options: RenderOptions,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build Discord HTTP client")?;
        Ok(Self {
            http,
            webhook_url,
            news_path,
            options,
        })
    }

    /// Build from config. Returns `Ok(None)` when no webhook env var is
    /// configured; a configured but unset variable is an error.
    pub fn from_config(alerts: &AlertsConfig, news: &NewsConfig) -> Result<Option<Self>> {
        let Some(env_name) = alerts.discord_webhook_env.as_deref() else {
            return Ok(None);
        };
        let url = AppConfig::resolve_env(env_name)?;
        let options = RenderOptions {
            max_fields: alerts.max_fields,
            news_per_ticker: if news.csv_path.is_some() {
                news.items_per_ticker
            } else {
                0
            },
        };
        Self::new(
            SecretString::new(url),
            news.csv_path.as_ref().map(PathBuf::from),
            options,
        )
        .map(Some)
    }

    fn news(&self) -> NewsIndex {
        match &self.news_path {
            Some(path) => NewsIndex::load_or_empty(path),
            None => NewsIndex::default(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, report: &AlertReport) -> Result<()> {
        let payload = render_report(report, &self.news(), self.options);
        debug!(
            kind = %report.kind,
            fields = payload.embeds.first().map(|e| e.fields.len()).unwrap_or(0),
            "Posting Discord webhook"
        );

        let resp = self
            .http
            .post(self.webhook_url.expose_secret().as_str())
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Discord webhook request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WatchError::Delivery {
                channel: CHANNEL_NAME.into(),
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        info!(kind = %report.kind, count = report.len(), "Report sent to Discord");
        Ok(())
    }

    fn name(&self) -> &'static str {
        CHANNEL_NAME
    }
}
