use crate::error::{Result, TrackerError};
use crate::models::{Faction, PlayerRecord, StatsSnapshot};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

pub const USER_AGENT: &str = concat!("bsgo-tracker/", env!("CARGO_PKG_VERSION"));

/// Source of player statistics
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetch the current snapshot from `source_url`
    async fn fetch(&self, source_url: &str) -> Result<StatsSnapshot>;
}

/// Fetches the online-player table from a BSGO account page
pub struct BsgoFetcher {
    client: Client,
}

impl BsgoFetcher {
    /// Create a new fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrackerError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Use an already configured HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatsSource for BsgoFetcher {
    async fn fetch(&self, source_url: &str) -> Result<StatsSnapshot> {
        debug!("Fetching stats from: {}", source_url);

        let response = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|e| TrackerError::fetch(source_url, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TrackerError::fetch(
                source_url,
                format!("HTTP request failed with status: {}", response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| TrackerError::fetch(source_url, format!("failed to read body: {e}")))?;

        let players = parse_player_table(&html)?;
        if players.is_empty() {
            return Err(TrackerError::fetch(source_url, "no player rows found in response"));
        }

        info!("Fetched {} players from {}", players.len(), source_url);
        Ok(StatsSnapshot::new(players))
    }
}

/// Parse the online-player table out of an account page
///
/// Rows need at least four cells: faction, player id, name and a numeric level.
/// Anything else (headers, spacer rows) is skipped.
pub fn parse_player_table(html: &str) -> Result<Vec<PlayerRecord>> {
    let document = Html::parse_document(html);

    let body_rows = selector("table tbody tr")?;
    let any_rows = selector("tr")?;
    let cell = selector("td")?;

    let mut rows: Vec<ElementRef> = document.select(&body_rows).collect();
    if rows.is_empty() {
        rows = document.select(&any_rows).collect();
    }

    let players = rows.into_iter().filter_map(|row| parse_player_row(&row, &cell)).collect();

    Ok(players)
}

fn parse_player_row(row: &ElementRef, cell: &Selector) -> Option<PlayerRecord> {
    let cols: Vec<String> =
        row.select(cell).map(|td| td.text().collect::<String>().trim().to_string()).collect();

    if cols.len() < 4 {
        return None;
    }

    let level_text = &cols[3];
    if level_text.is_empty() || !level_text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let level = level_text.parse::<u32>().ok()?;

    Some(PlayerRecord {
        faction: Faction::from_label(&cols[0]),
        player_id: cols[1].clone(),
        name: cols[2].clone(),
        level,
    })
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| TrackerError::fetch(css, format!("Failed to create selector: {e}")))
}
