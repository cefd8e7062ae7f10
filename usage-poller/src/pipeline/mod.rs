use std::time::SystemTime;

use meter_client::domain::NormalizedRecord;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

/// Why a single fetch+normalize cycle produced no record.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication failed, token might be expired")]
    Unauthorized,
    #[error("unexpected HTTP status {status}")]
    HttpError { status: u16 },
    #[error("no data received from API")]
    EmptyPayload,
    #[error("malformed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Unauthorized,
    HttpError,
    EmptyPayload,
    Malformed,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Unauthorized => "unauthorized",
            Self::HttpError => "http_error",
            Self::EmptyPayload => "empty_payload",
            Self::Malformed => "malformed",
        }
    }
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::Unauthorized => FailureKind::Unauthorized,
            Self::HttpError { .. } => FailureKind::HttpError,
            Self::EmptyPayload => FailureKind::EmptyPayload,
            Self::Malformed(_) => FailureKind::Malformed,
        }
    }
}

/// One upstream fetch followed by normalization.
///
/// Implementations either return a complete record or a tagged error; they
/// never hand back a partially filled record.
#[async_trait::async_trait]
pub trait UsageSource: Send + Sync {
    async fn fetch_and_normalize(&self) -> Result<Envelope<NormalizedRecord>, FetchError>;
}

#[async_trait::async_trait]
impl<T> UsageSource for std::sync::Arc<T>
where
    T: UsageSource + ?Sized,
{
    async fn fetch_and_normalize(&self) -> Result<Envelope<NormalizedRecord>, FetchError> {
        (**self).fetch_and_normalize().await
    }
}
