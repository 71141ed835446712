//! AgroMonitoring client for satellite NDVI history
//!
//! NDVI is only served for registered polygons, so each point gets a ~100 m
//! box registered first (or reused when the service reports a duplicate),
//! then the trailing-window history for that polygon is requested.
//!
//! Outcomes the service itself reports (no key, no imagery, API error status)
//! become an explicit "no data" summary. Transport and decoding failures are
//! returned as errors so the caller can decide on a fallback.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::geometry::BoundingBox;
use shared::{GpsCoordinates, NdviSample, NdviSummary};

use super::{http_client, SourceError};
use crate::services::geodata::NdviSource;

/// Side of the box registered around each point, meters
pub const POLYGON_SIZE_METERS: f64 = 100.0;

const MEASURED_SOURCE: &str = "AgroMonitoring Sentinel-2";

/// AgroMonitoring API client
#[derive(Clone)]
pub struct AgroMonitoringClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    window_days: i64,
}

#[derive(Debug, Serialize)]
struct PolygonRequest {
    name: String,
    external_id: String,
    geo_json: GeoJsonFeature,
}

#[derive(Debug, Serialize)]
struct GeoJsonFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: serde_json::Map<String, serde_json::Value>,
    geometry: GeoJsonPolygon,
}

#[derive(Debug, Serialize)]
struct GeoJsonPolygon {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Deserialize)]
struct PolygonResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

/// One entry of the NDVI history endpoint
#[derive(Debug, Deserialize)]
pub struct NdviHistoryEntry {
    pub dt: i64,
    pub data: NdviStats,
}

#[derive(Debug, Deserialize)]
pub struct NdviStats {
    pub mean: f64,
}

/// Result of trying to obtain a polygon id
enum PolygonLookup {
    Found(String),
    Rejected(StatusCode),
}

/// Result of a history request the service answered
enum HistoryOutcome {
    Entries(Vec<NdviHistoryEntry>),
    NoData(NdviSummary),
}

/// Pull the existing polygon id out of a duplicate-polygon message, e.g.
/// `Your polygon is duplicated your already existed polygon '5f3e...'`
pub fn duplicated_polygon_id(message: &str) -> Option<&str> {
    if !message.contains("already existed polygon") {
        return None;
    }
    let start = message.find('\'')? + 1;
    let len = message[start..].find('\'')?;
    let id = &message[start..start + len];
    (!id.is_empty()).then_some(id)
}

/// Stable external id for the box around a point
pub fn external_polygon_id(at: &GpsCoordinates) -> String {
    format!(
        "point_analysis_{}_{}",
        format!("{:.6}", at.latitude).replace(['.', '-'], "_"),
        format!("{:.6}", at.longitude).replace(['.', '-'], "_"),
    )
}

fn polygon_request(at: &GpsCoordinates) -> PolygonRequest {
    let ring = BoundingBox::around(at, POLYGON_SIZE_METERS).to_geojson_ring();
    PolygonRequest {
        name: format!("Polygon for {:.4},{:.4}", at.latitude, at.longitude),
        external_id: external_polygon_id(at),
        geo_json: GeoJsonFeature {
            kind: "Feature",
            properties: serde_json::Map::new(),
            geometry: GeoJsonPolygon {
                kind: "Polygon",
                coordinates: vec![ring],
            },
        },
    }
}

/// Summarize a history response
pub fn summarize_history(entries: &[NdviHistoryEntry]) -> NdviSummary {
    let samples: Vec<NdviSample> = entries
        .iter()
        .map(|e| NdviSample {
            dt: e.dt,
            ndvi: e.data.mean,
        })
        .collect();
    NdviSummary::from_samples(&samples, MEASURED_SOURCE)
}

impl AgroMonitoringClient {
    /// Create a new AgroMonitoringClient
    pub fn new(base_url: String, api_key: Option<String>, window_days: i64, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            window_days,
        }
    }

    /// Register the box around `at`, or reuse the one already registered
    async fn polygon_id(&self, at: &GpsCoordinates, api_key: &str) -> Result<PolygonLookup, SourceError> {
        let url = format!("{}/polygons", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("appid", api_key), ("duplicated", "true")])
            .json(&polygon_request(at))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let polygon: PolygonResponse = response.json().await?;
            return Ok(PolygonLookup::Found(polygon.id));
        }

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body: ApiMessage = response.json().await.unwrap_or(ApiMessage {
                message: String::new(),
            });
            if let Some(id) = duplicated_polygon_id(&body.message) {
                tracing::debug!("Reusing existing AgroMonitoring polygon {}", id);
                return Ok(PolygonLookup::Found(id.to_string()));
            }
        }

        tracing::warn!("AgroMonitoring polygon registration returned {}", status);
        Ok(PolygonLookup::Rejected(status))
    }

    /// NDVI history of a polygon between `start` and `end`
    async fn history(
        &self,
        polygon_id: &str,
        api_key: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HistoryOutcome, SourceError> {
        let url = format!("{}/ndvi/history/{}", self.base_url, polygon_id);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("start", start.timestamp().to_string()),
                ("end", end.timestamp().to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::warn!("No NDVI imagery for polygon {} in the window", polygon_id);
            return Ok(HistoryOutcome::NoData(NdviSummary::no_data(
                "AgroMonitoring (no satellite data for this location)",
            )));
        }
        if !status.is_success() {
            tracing::warn!("AgroMonitoring NDVI history returned {}", status);
            return Ok(HistoryOutcome::NoData(NdviSummary::no_data(format!(
                "AgroMonitoring (API error {})",
                status.as_u16()
            ))));
        }

        Ok(HistoryOutcome::Entries(response.json().await?))
    }
}

#[axum::async_trait]
impl NdviSource for AgroMonitoringClient {
    async fn ndvi_summary(&self, at: GpsCoordinates) -> Result<NdviSummary, SourceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(NdviSummary::no_data("AgroMonitoring (API key not configured)"));
        };

        let polygon_id = match self.polygon_id(&at, api_key).await? {
            PolygonLookup::Found(id) => id,
            PolygonLookup::Rejected(status) => {
                return Ok(NdviSummary::no_data(format!(
                    "AgroMonitoring (polygon registration failed: {})",
                    status.as_u16()
                )))
            }
        };

        let end = Utc::now();
        let start = end - Duration::days(self.window_days);

        match self.history(&polygon_id, api_key, start, end).await? {
            HistoryOutcome::Entries(entries) => Ok(summarize_history(&entries)),
            HistoryOutcome::NoData(no_data) => Ok(no_data),
        }
    }
}
