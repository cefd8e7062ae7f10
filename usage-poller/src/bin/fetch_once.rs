use anyhow::Result;
use usage_poller::{
    config::AppConfig, fields, observability, sources::HttpUsageSource, PollingCoordinator,
};

/// Perform a single fetch+normalize against the configured meter and print
/// the published values as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration (USAGE_POLLER_CONFIG can point at any config file).
    let cfg = AppConfig::load()?;

    let source = HttpUsageSource::from_config(&cfg.meter)?;
    let coordinator = PollingCoordinator::new(source, cfg.meter.poll_interval());
    coordinator.force_refresh().await?;

    let published = fields::publish(&coordinator.snapshot());
    println!("{}", serde_json::to_string_pretty(&published)?);

    Ok(())
}
