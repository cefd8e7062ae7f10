use anyhow::Result;
use usage_poller::{
    config::AppConfig, fields, observability, sources::HttpUsageSource, status_server,
    PollingCoordinator,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;
    tracing::info!(meter = ?cfg.meter, "configuration loaded");

    let source = HttpUsageSource::from_config(&cfg.meter)?;
    let coordinator = PollingCoordinator::new(source, cfg.meter.poll_interval());

    // Start status/metrics server if configured
    if let Some(server_cfg) = &cfg.server {
        status_server::install_recorder()?;
        status_server::init(&server_cfg.bind_addr, coordinator.subscribe()).await?;
    }

    // A failed first refresh aborts startup.
    coordinator.start().await?;

    let published = fields::publish(&coordinator.snapshot());
    tracing::info!(
        device = %published.device.name,
        values = published.values.len(),
        "meter values published"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    coordinator.stop().await;

    Ok(())
}
