//! Finviz Elite screener export client.
//!
//! Downloads the screener as CSV and turns it into raw header -> cell rows.
//!
//! Endpoint: `https://elite.finviz.com/export.ashx?<screener query>&auth=<token>`
//! Auth: Elite API token via the `auth` query param.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::SnapshotSource;
use crate::config::{AppConfig, ProviderConfig};
use crate::types::{FetchResult, RawRow, WatchError};

const SOURCE_NAME: &str = "finviz";

/// Finviz Elite export client.
pub struct FinvizClient {
    http: Client,
    export_url: String,
    screener_query: String,
    auth_token: SecretString,
}

impl FinvizClient {
    pub fn new(
        export_url: impl Into<String>,
        screener_query: impl Into<String>,
        auth_token: SecretString,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).context("Invalid user agent")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/csv,text/plain;q=0.9,*/*;q=0.8"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build Finviz HTTP client")?;

        Ok(Self {
            http,
            export_url: export_url.into(),
            screener_query: screener_query.into(),
            auth_token,
        })
    }

    /// Build a client from the `[provider]` config section, resolving the
    /// auth token from the environment.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let token = AppConfig::resolve_env(&cfg.auth_token_env)?;
        Self::new(
            cfg.export_url.clone(),
            cfg.screener_query.clone(),
            SecretString::new(token),
            &cfg.user_agent,
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    /// Export URL without the auth token (safe to log).
    fn url(&self) -> String {
        let query = self.screener_query.trim_start_matches('?');
        if query.is_empty() {
            self.export_url.clone()
        } else {
            format!("{}?{}", self.export_url, query)
        }
    }

    async fn fetch_csv(&self) -> Result<String> {
        let url = self.url();
        debug!(url = %url, "Requesting Finviz export");

        let resp = self
            .http
            .get(&url)
            .query(&[("auth", self.auth_token.expose_secret().as_str())])
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Finviz export request failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WatchError::Fetch {
                source_name: SOURCE_NAME.into(),
                message: format!("HTTP {status}"),
            }
            .into());
        }

        resp.text()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to read Finviz export body")
    }
}

#[async_trait]
impl SnapshotSource for FinvizClient {
    async fn fetch(&self) -> FetchResult {
        info!("Fetching live data from Finviz Elite");

        let body = match self.fetch_csv().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Finviz fetch failed");
                return FetchResult::Failure(format!("{e:#}"));
            }
        };

        match parse_export(&body) {
            Ok(rows) => {
                info!(count = rows.len(), "Fetched tickers from Finviz Elite");
                FetchResult::from_rows(rows)
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Finviz export could not be parsed");
                FetchResult::Failure(format!("{e:#}"))
            }
        }
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}

/// Parse a CSV export (header row + data rows) into raw rows.
///
/// Short rows are tolerated; missing trailing cells are simply absent
/// from the row map.
pub fn parse_export(body: &str) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .context("Finviz export has no header row")?
        .clone();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV record at row {}", line + 1))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
