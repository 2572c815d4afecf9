//! `news-check healthcheck`: probe for distroless images that ship no curl.
use std::{net::SocketAddr, time::Duration};

use thiserror::Error;

const DEFAULT_HTTP_PORT: u16 = 5000;

#[derive(Debug, Error)]
pub enum HealthcheckError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("health endpoint returned status: {0}")]
    Status(reqwest::StatusCode),
}

/// Probes the port from `NEWS_CHECK_HTTP_BIND`, falling back to 5000.
///
/// # Errors
/// Returns [`HealthcheckError`] when the service is unreachable or not live.
pub async fn healthcheck() -> Result<(), HealthcheckError> {
    let port = std::env::var("NEWS_CHECK_HTTP_BIND")
        .ok()
        .and_then(|raw| raw.parse::<SocketAddr>().ok())
        .map_or(DEFAULT_HTTP_PORT, |addr| addr.port());
    healthcheck_with_port(port).await
}

/// # Errors
/// Returns [`HealthcheckError`] when the service is unreachable or not live.
pub async fn healthcheck_with_port(port: u16) -> Result<(), HealthcheckError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(HealthcheckError::Client)?;

    let url = format!("http://127.0.0.1:{port}/health/live");
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(HealthcheckError::Request)?;

    if resp.status().is_success() {
        Ok(())
    } else {
        Err(HealthcheckError::Status(resp.status()))
    }
}
