//! HTTP fetcher for the readings endpoint.
//!
//! Issues a single GET to the configured endpoint and decodes a JSON array of
//! readings. [`Fetcher::try_fetch`] reports what went wrong; [`Fetcher::fetch`]
//! logs the failure and hands back an empty set instead.

use crate::core::RawDataPoint;
use std::time::Duration;

/// Fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Endpoint returning the JSON array of readings
    pub endpoint_url: String,
    /// Overall request timeout
    pub timeout: Duration,
}

impl FetcherConfig {
    /// Create a new fetcher configuration.
    pub fn new(endpoint_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            timeout,
        }
    }
}

/// Broad classification of a fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailureKind {
    /// The endpoint could not be reached or answered with an error status
    Outage,
    /// The endpoint answered but the payload was not a list of readings
    MalformedPayload,
    /// The client itself could not be set up
    Setup,
}

/// Fetch error types.
#[derive(Debug)]
pub enum FetchError {
    /// Client construction error
    Config(String),
    /// Network/transport error
    Transport(String),
    /// Endpoint returned a non-success status
    Status { status: u16, message: String },
    /// Response body could not be decoded
    Decode(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchFailureKind {
        match self {
            FetchError::Config(_) => FetchFailureKind::Setup,
            FetchError::Transport(_) | FetchError::Status { .. } => FetchFailureKind::Outage,
            FetchError::Decode(_) => FetchFailureKind::MalformedPayload,
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Config(msg) => write!(f, "Fetcher config error: {msg}"),
            FetchError::Transport(msg) => write!(f, "Error fetching data from API: {msg}"),
            FetchError::Status { status, message } => {
                write!(f, "Endpoint returned error ({status}): {message}")
            }
            FetchError::Decode(msg) => write!(f, "Malformed readings payload: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Client for the readings endpoint.
pub struct Fetcher {
    config: FetcherConfig,
    client: reqwest::Client,
}

impl Fetcher {
    /// Create a new fetcher.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// The endpoint this fetcher reads from.
    pub fn endpoint_url(&self) -> &str {
        &self.config.endpoint_url
    }

    /// Fetch readings, reporting the cause of any failure.
    pub async fn try_fetch(&self) -> Result<Vec<RawDataPoint>, FetchError> {
        tracing::debug!("Fetching readings from {}", self.config.endpoint_url);

        let response = self
            .client
            .get(&self.config.endpoint_url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let points: Vec<RawDataPoint> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::info!(
            count = points.len(),
            "Fetched readings from {}",
            self.config.endpoint_url
        );

        Ok(points)
    }

    /// Fetch readings, logging any failure and returning an empty set.
    pub async fn fetch(&self) -> Vec<RawDataPoint> {
        match self.try_fetch().await {
            Ok(points) => points,
            Err(e) => {
                tracing::error!(kind = ?e.kind(), "{}", e);
                Vec::new()
            }
        }
    }
}

/// URL on a local port that was just released, so nothing is listening.
#[cfg(test)]
pub(crate) fn closed_endpoint_url() -> String {
    let listener =
        std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind a local port");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{addr}/data")
}
