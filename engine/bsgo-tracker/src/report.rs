//! Builds the webhook message for one destination from a stats snapshot

use crate::chart::ChartRenderer;
use crate::discord::{Attachment, WebhookMessage};
use crate::models::{FactionSample, StatsSnapshot};
use tracing::warn;

pub const CHART_FILENAME: &str = "bsgo_stats.png";

/// Faction-lead line over all non-tied history samples
pub fn leader_text(history: &[FactionSample]) -> String {
    if history.is_empty() {
        return "No history yet.".to_string();
    }

    let non_ties: Vec<&FactionSample> = history.iter().filter(|s| s.colonial != s.cylon).collect();
    if non_ties.is_empty() {
        return "All samples tied.".to_string();
    }

    let total = non_ties.len() as f64;
    let colonial_ahead = non_ties.iter().filter(|s| s.colonial > s.cylon).count() as f64;
    let cylon_ahead = non_ties.len() as f64 - colonial_ahead;

    format!(
        "Colonial ahead: {:.1}% | Cylon ahead: {:.1}%",
        colonial_ahead * 100.0 / total,
        cylon_ahead * 100.0 / total
    )
}

/// Message text: faction counts, total and the faction-lead line
pub fn summary_text(label: &str, snapshot: &StatsSnapshot, history: &[FactionSample]) -> String {
    let prefix = if label.is_empty() { String::new() } else { format!("[{label}] ") };

    format!(
        "{prefix}Colonial Players: {}\nCylon Players: {}\nTotal Players: {}\n{}",
        snapshot.colonial_count(),
        snapshot.cylon_count(),
        snapshot.total_count(),
        leader_text(history)
    )
}

/// Summary text plus the chart image; a chart failure degrades to text only
pub fn build_message(
    charts: &ChartRenderer,
    label: &str,
    snapshot: &StatsSnapshot,
    history: &[FactionSample],
) -> WebhookMessage {
    let content = summary_text(label, snapshot, history);

    let attachments = match charts.render(label, snapshot, history) {
        Ok(png) => vec![Attachment::png(CHART_FILENAME, png)],
        Err(e) => {
            warn!("[{}] Chart skipped: {}", label, e);
            Vec::new()
        }
    };

    WebhookMessage { content, attachments }
}
