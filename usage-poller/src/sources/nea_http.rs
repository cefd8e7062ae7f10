use std::time::{Duration, SystemTime};

use meter_client::domain::NormalizedRecord;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, StatusCode, Url,
};
use serde_json::Value;

use crate::{
    config::MeterConfig,
    pipeline::{Envelope, FetchError, UsageSource},
    transform,
};

/// Failure to construct the source. Never recorded as a poll failure.
#[derive(thiserror::Error, Debug)]
pub enum SourceBuildError {
    #[error("invalid data url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Pulls the billing/usage document for one meter from the NEA API.
#[derive(Clone)]
pub struct HttpUsageSource {
    client: Client,
    data_url: Url,
    access_token: String,
}

impl HttpUsageSource {
    pub fn new(
        data_url: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceBuildError> {
        let data_url = Url::parse(data_url).map_err(|e| SourceBuildError::InvalidUrl {
            url: data_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            data_url,
            access_token: access_token.into(),
        })
    }

    pub fn from_config(cfg: &MeterConfig) -> Result<Self, SourceBuildError> {
        Self::new(&cfg.data_url, cfg.access_token.clone(), cfg.request_timeout())
    }

    async fn fetch_body(&self) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(self.data_url.clone())
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| FetchError::Transport(format!("failed to read body: {e}")))?;
                serde_json::from_slice(&bytes)
                    .map_err(|e| FetchError::Malformed(format!("invalid JSON body: {e}")))
            }
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
            status => Err(FetchError::HttpError {
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl UsageSource for HttpUsageSource {
    async fn fetch_and_normalize(&self) -> Result<Envelope<NormalizedRecord>, FetchError> {
        let body = self.fetch_body().await?;
        let received_at = SystemTime::now();
        let record = transform::normalize_payload(&body)?;

        Ok(Envelope {
            payload: record,
            received_at,
        })
    }
}
