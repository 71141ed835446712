//! External API integrations

pub mod agromonitoring;
pub mod open_meteo;
pub mod soilgrids;
pub mod vision;

pub use agromonitoring::AgroMonitoringClient;
pub use open_meteo::OpenMeteoClient;
pub use soilgrids::SoilGridsClient;
pub use vision::VisionClient;

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

/// Why an external data source could not deliver.
///
/// The geodata aggregator turns these into placeholders; they never reach
/// an HTTP response.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

/// Shared HTTP client with a per-service timeout
pub(crate) fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Fail with the status and body when the response is not 2xx
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, SourceError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(SourceError::Status { status, body })
}
