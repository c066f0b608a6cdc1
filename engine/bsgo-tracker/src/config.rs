//! Configuration for the BSGO tracker
//!
//! Destinations come from `WEBHOOK_URLS`, either as a comma-separated list of
//! webhook URLs or as a JSON array of `{url, bsgo_url?, label?}` objects.

use crate::error::{Result, TrackerError};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Stats page used when a destination does not name its own
pub const DEFAULT_BSGO_URL: &str = "https://bsgo.fun/Services/Identity/Account/EU";

pub const DEFAULT_UPDATE_MINUTES: f64 = 15.0;

pub const DEFAULT_STATE_DIR: &str = ".";

/// Faction samples kept per destination (30 days at the default interval)
pub const DEFAULT_HISTORY_SAMPLES: usize = 2880;

/// One Discord webhook plus the stats page it reports on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Discord webhook endpoint; identifies the destination
    pub url: String,
    /// Stats source for this destination
    pub bsgo_url: String,
    /// Human readable name used in logs and message prefixes
    pub label: String,
}

/// Process-wide values that destinations fall back to
#[derive(Debug, Clone)]
pub struct DestinationDefaults {
    pub bsgo_url: String,
}

impl Default for DestinationDefaults {
    fn default() -> Self {
        Self { bsgo_url: DEFAULT_BSGO_URL.to_string() }
    }
}

/// JSON form of a destination entry
#[derive(Debug, Deserialize)]
struct DestinationEntry {
    url: String,
    #[serde(default)]
    bsgo_url: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

/// Tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Destinations in configured order
    pub destinations: Vec<Destination>,

    /// Poll interval in minutes, as configured
    pub update_minutes: f64,

    /// Poll interval, validated to fit a `Duration`
    pub update_interval: Duration,

    /// Stats source used by destinations without their own
    pub default_bsgo_url: String,

    /// Directory for message-state slots and faction history
    pub state_dir: PathBuf,

    /// Faction samples kept per destination for the chart and lead line
    pub history_samples: usize,

    /// Timeout for stats page requests in seconds
    pub fetch_timeout_secs: u64,

    /// Timeout for webhook requests in seconds
    pub publish_timeout_secs: u64,
}

impl TrackerConfig {
    /// Load configuration from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_bsgo_url = lookup("BSGO_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BSGO_URL.to_string());
        validate_url(&default_bsgo_url, "BSGO_URL")?;

        let raw_webhooks = lookup("WEBHOOK_URLS").unwrap_or_default();
        if raw_webhooks.trim().is_empty() {
            return Err(TrackerError::config(
                "WEBHOOK_URLS is required (comma-separated URLs or JSON list)",
            ));
        }

        let defaults = DestinationDefaults { bsgo_url: default_bsgo_url.clone() };
        let destinations = parse_destinations(&raw_webhooks, &defaults)?;

        let (update_minutes, update_interval) = match lookup("UPDATE_MINUTES") {
            Some(raw) if !raw.trim().is_empty() => parse_update_minutes(&raw)?,
            _ => (DEFAULT_UPDATE_MINUTES, Duration::from_secs(DEFAULT_UPDATE_MINUTES as u64 * 60)),
        };

        let history_samples = match lookup("HISTORY_SAMPLES") {
            Some(raw) if !raw.trim().is_empty() => parse_history_samples(&raw)?,
            _ => DEFAULT_HISTORY_SAMPLES,
        };

        let state_dir = lookup("STATE_DIR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_STATE_DIR.to_string());

        Ok(Self {
            destinations,
            update_minutes,
            update_interval,
            default_bsgo_url,
            state_dir: PathBuf::from(state_dir),
            history_samples,
            fetch_timeout_secs: 30,
            publish_timeout_secs: 60,
        })
    }

    /// Time to sleep between cycles
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

/// Parse the destination list from a raw `WEBHOOK_URLS` value
pub fn parse_destinations(raw: &str, defaults: &DestinationDefaults) -> Result<Vec<Destination>> {
    let raw = raw.trim();

    let destinations = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(entries)) => parse_json_entries(entries, defaults)?,
        _ => parse_comma_separated(raw, defaults),
    };

    if destinations.is_empty() {
        return Err(TrackerError::config("no webhook destinations configured"));
    }

    for destination in &destinations {
        validate_url(&destination.url, &destination.label)?;
        validate_url(&destination.bsgo_url, &destination.label)?;
    }

    warn_on_duplicates(&destinations);

    Ok(destinations)
}

fn parse_json_entries(
    entries: Vec<serde_json::Value>,
    defaults: &DestinationDefaults,
) -> Result<Vec<Destination>> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let entry: DestinationEntry = serde_json::from_value(value).map_err(|e| {
                TrackerError::config(format!("WEBHOOK_URLS entry {} is invalid: {}", index + 1, e))
            })?;

            Ok(Destination {
                url: entry.url.trim().to_string(),
                bsgo_url: non_blank(entry.bsgo_url).unwrap_or_else(|| defaults.bsgo_url.clone()),
                label: non_blank(entry.label).unwrap_or_else(|| fallback_label(index)),
            })
        })
        .collect()
}

fn parse_comma_separated(raw: &str, defaults: &DestinationDefaults) -> Vec<Destination> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(index, url)| Destination {
            url: url.to_string(),
            bsgo_url: defaults.bsgo_url.clone(),
            label: fallback_label(index),
        })
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn fallback_label(index: usize) -> String {
    format!("Webhook {}", index + 1)
}

/// Minutes as configured plus the matching sleep duration
fn parse_update_minutes(raw: &str) -> Result<(f64, Duration)> {
    let minutes = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| TrackerError::config(format!("Invalid UPDATE_MINUTES: '{raw}'")))?;

    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(TrackerError::config(format!("UPDATE_MINUTES must be positive, got {raw}")));
    }

    let interval = Duration::try_from_secs_f64(minutes * 60.0)
        .map_err(|_| TrackerError::config(format!("UPDATE_MINUTES is too large: {raw}")))?;

    Ok((minutes, interval))
}

fn parse_history_samples(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(samples) if samples > 0 => Ok(samples),
        _ => Err(TrackerError::config(format!("HISTORY_SAMPLES must be a positive integer, got '{raw}'"))),
    }
}

fn validate_url(url: &str, context: &str) -> Result<()> {
    let parsed = Url::parse(url)
        .map_err(|e| TrackerError::config(format!("{context}: '{url}' is not a valid URL ({e})")))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(TrackerError::config(format!("{context}: '{url}' is not an http(s) URL")));
    }

    Ok(())
}

/// Duplicate URLs share one state slot, so their messages overwrite each other
fn warn_on_duplicates(destinations: &[Destination]) {
    let mut seen = HashSet::new();
    for destination in destinations {
        if !seen.insert(destination.url.as_str()) {
            warn!(
                "Destination '{}' reuses a webhook URL already configured; both will edit the same message",
                destination.label
            );
        }
    }
}
