use std::{sync::Arc, time::Duration};

use meter_client::domain::NormalizedRecord;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use crate::{
    pipeline::{Envelope, FailureKind, FetchError, UsageSource},
    transform,
};

#[derive(Debug, Clone, Serialize)]
pub struct PollFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// What subscribers see after every completed cycle.
///
/// `record` only ever changes on success; failures update the bookkeeping
/// fields and leave the last good record in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollStatus {
    pub record: Option<Arc<NormalizedRecord>>,
    pub fingerprint: Option<String>,
    pub cycles: u64,
    pub consecutive_failures: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_success_at: Option<OffsetDateTime>,
    pub last_failure: Option<PollFailure>,
}

impl PollStatus {
    /// True while the cached record predates at least one failed cycle.
    pub fn is_stale(&self) -> bool {
        self.consecutive_failures > 0
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CoordinatorError {
    #[error("initial refresh failed: {0}")]
    FirstRefresh(#[source] FetchError),
    #[error("coordinator is already running")]
    AlreadyRunning,
}

struct Inner<S> {
    source: S,
    interval: Duration,
    // Serializes scheduled ticks and force_refresh.
    poll_lock: Mutex<()>,
    state: watch::Sender<PollStatus>,
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Polls a `UsageSource` on a fixed interval and caches the latest record.
pub struct PollingCoordinator<S> {
    inner: Arc<Inner<S>>,
    running: Mutex<Option<Running>>,
}

impl<S> PollingCoordinator<S>
where
    S: UsageSource + 'static,
{
    pub fn new(source: S, interval: Duration) -> Self {
        let (state, _) = watch::channel(PollStatus::default());

        Self {
            inner: Arc::new(Inner {
                source,
                interval,
                poll_lock: Mutex::new(()),
                state,
            }),
            running: Mutex::new(None),
        }
    }

    /// Run the first refresh inline, then arm the schedule.
    ///
    /// A failed first refresh is returned to the caller and nothing is
    /// scheduled. Every later failure is recorded and swallowed.
    pub async fn start(&self) -> Result<(), CoordinatorError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(CoordinatorError::AlreadyRunning);
        }

        self.inner
            .poll_once()
            .await
            .map_err(CoordinatorError::FirstRefresh)?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_schedule(self.inner.clone(), cancel.clone()));
        *running = Some(Running { cancel, task });

        tracing::info!(interval_secs = self.inner.interval.as_secs(), "poll schedule started");
        Ok(())
    }

    /// Cancel the schedule and wait for the loop to exit.
    ///
    /// An in-flight fetch is allowed to finish; it is bounded by the HTTP
    /// client timeout.
    pub async fn stop(&self) {
        let running = self.running.lock().await.take();
        let Some(Running { cancel, task }) = running else {
            return;
        };

        cancel.cancel();
        if let Err(e) = task.await {
            tracing::error!(error = %e, "poll task ended abnormally");
        }
        tracing::info!("poll schedule stopped");
    }

    /// Run one cycle now, serialized with the schedule.
    ///
    /// The outcome is recorded exactly like a scheduled tick and also
    /// returned.
    pub async fn force_refresh(&self) -> Result<Arc<NormalizedRecord>, FetchError> {
        self.inner.poll_once().await
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub fn snapshot(&self) -> PollStatus {
        self.inner.state.borrow().clone()
    }

    pub fn record(&self) -> Option<Arc<NormalizedRecord>> {
        self.inner.state.borrow().record.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollStatus> {
        self.inner.state.subscribe()
    }

    /// Stream yielding the status after each completed cycle.
    pub fn updates(&self) -> WatchStream<PollStatus> {
        WatchStream::from_changes(self.subscribe())
    }
}

impl<S> Drop for PollingCoordinator<S> {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.try_lock() {
            if let Some(r) = running.take() {
                r.cancel.cancel();
            }
        }
    }
}

async fn run_schedule<S>(inner: Arc<Inner<S>>, cancel: CancellationToken)
where
    S: UsageSource + 'static,
{
    // First refresh already happened in start().
    let start = tokio::time::Instant::now() + inner.interval;
    let mut ticker = tokio::time::interval_at(start, inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("poll schedule cancelled");
                return;
            }
            _ = ticker.tick() => {
                // Failures are recorded inside poll_once.
                let _ = inner.poll_once().await;
            }
        }
    }
}

impl<S: UsageSource> Inner<S> {
    async fn poll_once(&self) -> Result<Arc<NormalizedRecord>, FetchError> {
        let _serial = self.poll_lock.lock().await;

        let started = std::time::Instant::now();
        let outcome = self.source.fetch_and_normalize().await;
        metrics::histogram!("nea_poll_duration_seconds").record(started.elapsed().as_secs_f64());
        metrics::counter!("nea_poll_cycles_total").increment(1);

        match outcome {
            Ok(env) => Ok(self.record_success(env)),
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    fn record_success(&self, env: Envelope<NormalizedRecord>) -> Arc<NormalizedRecord> {
        let at = OffsetDateTime::from(env.received_at);
        let record = Arc::new(env.payload);
        let digest = transform::fingerprint(&record);
        let changed = self.state.borrow().fingerprint.as_deref() != Some(digest.as_str());

        self.state.send_modify(|s| {
            s.record = Some(record.clone());
            s.fingerprint = Some(digest);
            s.cycles += 1;
            s.consecutive_failures = 0;
            s.last_success_at = Some(at);
        });

        metrics::gauge!("nea_consecutive_failures").set(0.0);
        metrics::gauge!("nea_last_success_timestamp_seconds").set(at.unix_timestamp() as f64);
        tracing::info!(
            meter = %record.meter_name,
            months = record.meter_analytics.len(),
            changed,
            "poll succeeded"
        );

        record
    }

    fn record_failure(&self, e: &FetchError) {
        let kind = e.kind();
        metrics::counter!("nea_poll_failures_total", "kind" => kind.as_str()).increment(1);

        let mut failures = 0;
        self.state.send_modify(|s| {
            s.cycles += 1;
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
            s.last_failure = Some(PollFailure {
                kind,
                message: e.to_string(),
                at: OffsetDateTime::now_utc(),
            });
            failures = s.consecutive_failures;
        });

        metrics::gauge!("nea_consecutive_failures").set(f64::from(failures));
        tracing::error!(
            kind = kind.as_str(),
            error = %e,
            consecutive_failures = failures,
            "poll failed, keeping previous record"
        );
    }
}
