//! Discord embed rendering.
//!
//! Pure formatting: turns an `AlertReport` (plus optional news) into a
//! webhook payload. Field limits follow Discord's embed constraints.

use serde::Serialize;

use crate::news::NewsIndex;
use crate::types::{AlertReport, Classification, Decision, ReportKind, TickerObservation};

/// Discord rejects embed field values over 1024 characters.
pub const FIELD_VALUE_LIMIT: usize = 1024;
const SUMMARY_LIMIT: usize = 250;
const TITLE_LIMIT: usize = 100;

const COLOR_GOLD: u32 = 0xF1C40F;
const COLOR_BLUE: u32 = 0x3498DB;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

/// Options that shape a rendered report.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Maximum tickers rendered as fields.
    pub max_fields: usize,
    /// Headlines per ticker (0 disables the news section).
    pub news_per_ticker: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_fields: 5,
            news_per_ticker: 3,
        }
    }
}

/// Build the webhook payload for a report.
pub fn render_report(report: &AlertReport, news: &NewsIndex, opts: RenderOptions) -> WebhookPayload {
    let shown: Vec<(&TickerObservation, &Decision)> = report
        .observations
        .iter()
        .filter_map(|obs| report.decisions.get(&obs.symbol).map(|d| (obs, d)))
        .filter(|(_, d)| d.is_alert())
        .take(opts.max_fields)
        .collect();

    let fields = shown
        .iter()
        .enumerate()
        .map(|(i, (obs, decision))| render_field(i + 1, obs, decision, news, opts, report.threshold))
        .collect();

    let alerts = report.decisions.values().filter(|d| d.is_alert()).count();
    let updated = report.generated_at.format("%Y-%m-%d %H:%M:%S UTC");

    let (title, description, color, content) = match report.kind {
        ReportKind::Alert => {
            let title = if shown.len() == 1 {
                "Top Momentum Gainer".to_string()
            } else {
                format!("Top {} Momentum Gainers", shown.len())
            };
            let description = format!(
                "🔔 **{alerts} ticker(s)** met the +{}% threshold\nUpdated: {updated}",
                report.threshold
            );
            (title, description, COLOR_GOLD, None)
        }
        ReportKind::Manual => (
            format!("📈 Top {} Performers - Live from Finviz Elite", shown.len()),
            format!("On-demand report (threshold bypassed)\nUpdated: {updated}"),
            COLOR_BLUE,
            None,
        ),
        ReportKind::Forced => (
            format!("📈 Top {} Performers - Live from Finviz Elite", shown.len()),
            format!("Forced report (threshold bypassed)\nUpdated: {updated}"),
            COLOR_BLUE,
            Some("🔧 **Forced Update** (threshold bypassed)".to_string()),
        ),
    };

    WebhookPayload {
        content,
        embeds: vec![Embed {
            title,
            description,
            color,
            fields,
            footer: EmbedFooter {
                text: format!("Live Finviz Elite Data | Threshold: +{}%", report.threshold),
            },
            timestamp: report.generated_at.to_rfc3339(),
        }],
    }
}

fn render_field(
    rank: usize,
    obs: &TickerObservation,
    decision: &Decision,
    news: &NewsIndex,
    opts: RenderOptions,
    threshold: f64,
) -> EmbedField {
    let d = &obs.display;
    let symbol = &obs.symbol;

    let name = match (decision.classification, decision.delta) {
        (Classification::Threshold, Some(delta)) => {
            format!("🚀 #{rank} - {symbol} - ${} (+{delta:.2}% increase)", d.price)
        }
        (Classification::New, _) => format!("🆕 #{rank} - {symbol} - ${} (New)", d.price),
        _ => format!("📊 #{rank} - {symbol} - ${}", d.price),
    };

    let mut value = String::new();
    match decision.classification {
        Classification::Threshold => {
            let delta = decision.delta.unwrap_or_default();
            let previous = decision.previous_value.unwrap_or_default();
            value.push_str("**🔔 Threshold Alert:**\n");
            value.push_str(&format!(
                "• Increased by **+{delta:.2}%** from last check (threshold +{threshold}%)\n"
            ));
            value.push_str(&format!(
                "• Previous: `{previous:.2}%` → Current: `{}`\n\n",
                d.change_from_open
            ));
        }
        Classification::New => {
            value.push_str("**🔔 Threshold Alert:**\n");
            value.push_str("• **NEW** entry\n");
            value.push_str(&format!(
                "• Previous: `Not tracked` → Current: `{}`\n\n",
                d.change_from_open
            ));
        }
        _ => {}
    }

    value.push_str("**📊 Performance:**\n");
    value.push_str(&format!("• Change from Open: `{}`\n", d.change_from_open));
    value.push_str(&format!("• Monthly: `{}`\n", d.perf_month));
    value.push_str(&format!("• YTD: `{}`\n", d.perf_ytd));
    value.push_str(&format!("• Earnings: {}\n\n", d.earnings_date));

    if opts.news_per_ticker > 0 {
        let items = news.latest(symbol, opts.news_per_ticker);
        if items.is_empty() {
            value.push_str("**📰 Latest News:** No recent news available");
        } else {
            value.push_str("**📰 Latest News:**\n");
            for (i, item) in items.iter().enumerate() {
                let title = truncate_chars(&item.title, TITLE_LIMIT, "");
                let summary = truncate_chars(&item.summary, SUMMARY_LIMIT, "...");
                value.push_str(&format!("\n`{}.` **{title}**\n", i + 1));
                value.push_str(&format!("_{summary}_\n"));
                value.push_str(&format!(
                    "[Read More]({}) • {}\n",
                    item.link,
                    item.display_date()
                ));
            }
        }
    }

    EmbedField {
        name,
        value: fit_field_value(value),
        inline: false,
    }
}

/// Cut `text` to at most `limit` characters, appending `suffix` if cut.
fn truncate_chars(text: &str, limit: usize, suffix: &str) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str(suffix);
    out
}

fn fit_field_value(value: String) -> String {
    if value.chars().count() <= FIELD_VALUE_LIMIT {
        return value;
    }
    truncate_chars(&value, FIELD_VALUE_LIMIT - 4, "...")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
