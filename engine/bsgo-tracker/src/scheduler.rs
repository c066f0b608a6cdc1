use crate::chart::ChartRenderer;
use crate::config::{Destination, TrackerConfig};
use crate::discord::DiscordWebhookClient;
use crate::error::{Result, TrackerError};
use crate::fetcher::{BsgoFetcher, StatsSource};
use crate::history::{FileHistoryStore, HistoryStore};
use crate::publisher::{PublishOutcome, WebhookPublisher};
use crate::report::build_message;
use crate::state::{FileStateStore, MessageStateStore};
use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Outcome counts for one pass over all destinations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs fetch -> build -> publish for every destination, then sleeps
pub struct TrackerScheduler<S, C, M, H> {
    config: TrackerConfig,
    source: S,
    publisher: WebhookPublisher<C, M>,
    history: H,
    charts: ChartRenderer,
}

impl TrackerScheduler<BsgoFetcher, DiscordWebhookClient, FileStateStore, FileHistoryStore> {
    /// Production wiring: HTTP fetcher, Discord client and file-backed stores
    pub fn from_config(config: TrackerConfig) -> Result<Self> {
        let source = BsgoFetcher::new(config.fetch_timeout())?;
        let client = DiscordWebhookClient::new(config.publish_timeout())?;
        let state = FileStateStore::new(&config.state_dir);
        let history = FileHistoryStore::with_retention(&config.state_dir, config.history_samples);

        Ok(Self::new(config, source, WebhookPublisher::new(client, state), history))
    }
}

impl<S, C, M, H> TrackerScheduler<S, C, M, H>
where
    S: StatsSource,
    C: crate::discord::WebhookClient,
    M: MessageStateStore,
    H: HistoryStore,
{
    pub fn new(
        config: TrackerConfig,
        source: S,
        publisher: WebhookPublisher<C, M>,
        history: H,
    ) -> Self {
        Self { config, source, publisher, history, charts: ChartRenderer::new() }
    }

    /// Replace the chart renderer
    pub fn with_charts(mut self, charts: ChartRenderer) -> Self {
        self.charts = charts;
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn publisher(&self) -> &WebhookPublisher<C, M> {
        &self.publisher
    }

    /// Start the scheduler (runs indefinitely)
    pub async fn start(&self) {
        info!(
            "Loaded {} webhook(s). Interval: {} min.",
            self.config.destinations.len(),
            self.config.update_minutes
        );

        loop {
            info!("Running update at {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));

            let report = self.run_cycle().await;
            info!(
                "Cycle finished: {} published, {} failed. Next update in {} minutes...",
                report.succeeded, report.failed, self.config.update_minutes
            );

            sleep(self.config.update_interval()).await;
        }
    }

    /// One pass over all destinations in configured order
    ///
    /// Failures are logged per destination and never stop the pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for destination in &self.config.destinations {
            match self.run_destination(destination).await {
                Ok(_) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    log_failure(destination, &e);
                }
            }
        }

        report
    }

    /// Fetch, record history, build and publish for a single destination
    pub async fn run_destination(&self, destination: &Destination) -> Result<PublishOutcome> {
        let snapshot = self.source.fetch(&destination.bsgo_url).await?;

        let sample = snapshot.faction_sample();
        if let Err(e) = self.history.append(destination, sample).await {
            warn!("[{}] Failed to record history: {}", destination.label, e);
        }

        let history = match self.history.load(destination).await {
            Ok(samples) if !samples.is_empty() => samples,
            Ok(_) => vec![sample],
            Err(e) => {
                warn!("[{}] Failed to load history: {}", destination.label, e);
                vec![sample]
            }
        };

        let message = build_message(&self.charts, &destination.label, &snapshot, &history);
        self.publisher.publish(destination, &message).await
    }
}

fn log_failure(destination: &Destination, err: &TrackerError) {
    match err {
        TrackerError::StateStore { .. } => error!(
            "[{}] Message state unavailable, the next cycle may post a duplicate: {}",
            destination.label, err
        ),
        TrackerError::Fetch { .. } => {
            warn!("[{}] Skipping this cycle: {}", destination.label, err)
        }
        _ => error!("[{}] Update failed: {}", destination.label, err),
    }
}
