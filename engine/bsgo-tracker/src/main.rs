use bsgo_tracker::{TrackerConfig, TrackerScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting BSGO Tracker Service");

    let config = match TrackerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration failed: {}", e);
            return Err(e.into());
        }
    };

    for destination in &config.destinations {
        info!("[{}] stats source: {}", destination.label, destination.bsgo_url);
    }

    let scheduler = TrackerScheduler::from_config(config)?;

    // Runs until the process is terminated
    scheduler.start().await;

    Ok(())
}
