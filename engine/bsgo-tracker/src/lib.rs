//! BSGO Tracker Service
//!
//! Periodically fetches online-player statistics from a BSGO account page and
//! publishes them, as text plus a chart, to one or more Discord webhooks. Each
//! webhook keeps a single message that is edited on every cycle instead of
//! posting a new one.
//!
//! ## Architecture
//!
//! - **config**: destinations, poll interval and defaults from the environment
//! - **fetcher**: HTTP + HTML scraping of the player table
//! - **report** / **chart**: message text and PNG chart
//! - **state**: per-webhook id of the message to edit
//! - **publisher**: create-or-edit against the Discord webhook API
//! - **scheduler**: the fetch -> build -> publish loop

pub mod chart;
pub mod config;
pub mod discord;
pub mod error;
pub mod fetcher;
pub mod history;
pub mod models;
pub mod publisher;
pub mod report;
pub mod scheduler;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use chart::ChartRenderer;
pub use config::{Destination, DestinationDefaults, TrackerConfig};
pub use discord::{DiscordWebhookClient, EditOutcome, WebhookClient, WebhookMessage};
pub use error::{Result, TrackerError};
pub use fetcher::{BsgoFetcher, StatsSource};
pub use history::{FileHistoryStore, HistoryStore, InMemoryHistoryStore};
pub use models::*;
pub use publisher::{PublishOutcome, WebhookPublisher};
pub use scheduler::{CycleReport, TrackerScheduler};
pub use state::{FileStateStore, InMemoryStateStore, MessageStateStore};
