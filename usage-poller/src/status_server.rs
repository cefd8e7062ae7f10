use std::net::SocketAddr;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tokio::sync::watch;

use crate::{
    coordinator::PollStatus,
    fields::{self, PublishedMeter},
};

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn install_recorder() -> anyhow::Result<()> {
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub fn router(status: watch::Receiver<PollStatus>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .route("/values", get(values_handler))
        .with_state(status)
}

/// Bind the status listener and serve it in the background.
pub async fn init(bind_addr: &str, status: watch::Receiver<PollStatus>) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.bind_addr '{bind_addr}': {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = router(status);

    tracing::info!(%addr, "status server listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!(error = %e, "status server error");
        }
    });

    Ok(())
}

async fn metrics_handler() -> Result<String, StatusCode> {
    PROM_HANDLE
        .get()
        .map(|h| h.render())
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

async fn status_handler(State(status): State<watch::Receiver<PollStatus>>) -> Json<PollStatus> {
    Json(status.borrow().clone())
}

async fn values_handler(State(status): State<watch::Receiver<PollStatus>>) -> Json<PublishedMeter> {
    let snapshot = status.borrow().clone();
    Json(fields::publish(&snapshot))
}
