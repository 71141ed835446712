//! Geodata aggregation for a single coordinate
//!
//! Soil, weather, terrain, and NDVI are fetched concurrently and each falls
//! back on its own. The call always returns a fully shaped context.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use shared::{
    GeoDataContext, GpsCoordinates, NdviSummary, PrecipitationSummary, SoilSummary,
    TerrainSummary,
};

use crate::config::Config;
use crate::external::{
    AgroMonitoringClient, OpenMeteoClient, SoilGridsClient, SourceError,
};

/// Soil composition by coordinate
#[axum::async_trait]
pub trait SoilSource: Send + Sync {
    async fn soil_summary(&self, at: GpsCoordinates) -> Result<SoilSummary, SourceError>;
}

/// Trailing-window rainfall and temperature by coordinate
#[axum::async_trait]
pub trait WeatherSource: Send + Sync {
    async fn precipitation_summary(
        &self,
        at: GpsCoordinates,
        today: NaiveDate,
    ) -> Result<PrecipitationSummary, SourceError>;
}

/// Elevation, slope, and aspect by coordinate
#[axum::async_trait]
pub trait ElevationSource: Send + Sync {
    async fn terrain_summary(&self, at: GpsCoordinates) -> Result<TerrainSummary, SourceError>;
}

/// Vegetation index history by coordinate.
///
/// `Ok` covers both measured values and an explicit "no data" answer from the
/// service. `Err` means the pipeline itself failed.
#[axum::async_trait]
pub trait NdviSource: Send + Sync {
    async fn ndvi_summary(&self, at: GpsCoordinates) -> Result<NdviSummary, SourceError>;
}

/// Merges the four sources into a [`GeoDataContext`]
#[derive(Clone)]
pub struct GeoDataAggregator {
    soil: Arc<dyn SoilSource>,
    weather: Arc<dyn WeatherSource>,
    elevation: Arc<dyn ElevationSource>,
    ndvi: Arc<dyn NdviSource>,
}

/// Plausible NDVI around 0.45 (+/- 0.2) for when the NDVI pipeline breaks
fn simulated_ndvi() -> f64 {
    0.45 + (rand::thread_rng().gen::<f64>() - 0.5) * 0.4
}

impl GeoDataAggregator {
    pub fn new(
        soil: Arc<dyn SoilSource>,
        weather: Arc<dyn WeatherSource>,
        elevation: Arc<dyn ElevationSource>,
        ndvi: Arc<dyn NdviSource>,
    ) -> Self {
        Self {
            soil,
            weather,
            elevation,
            ndvi,
        }
    }

    /// Wire the HTTP clients from configuration
    pub fn from_config(config: &Config) -> Self {
        let open_meteo = Arc::new(OpenMeteoClient::new(
            config.open_meteo.forecast_url.clone(),
            config.open_meteo.elevation_url.clone(),
            config.analysis.window_days,
            config.open_meteo.timeout_secs,
        ));

        Self::new(
            Arc::new(SoilGridsClient::new(
                config.soilgrids.base_url.clone(),
                config.soilgrids.timeout_secs,
            )),
            open_meteo.clone(),
            open_meteo,
            Arc::new(AgroMonitoringClient::new(
                config.agromonitoring.base_url.clone(),
                config.agromonitoring.api_key.clone(),
                config.analysis.window_days,
                config.agromonitoring.timeout_secs,
            )),
        )
    }

    /// Context for `at` as of today (UTC)
    pub async fn fetch(&self, at: GpsCoordinates, crop_hint: &str) -> GeoDataContext {
        self.fetch_on(at, crop_hint, Utc::now().date_naive()).await
    }

    /// Context for `at` with weather windows ending on `today`
    pub async fn fetch_on(
        &self,
        at: GpsCoordinates,
        crop_hint: &str,
        today: NaiveDate,
    ) -> GeoDataContext {
        let (soil, weather, terrain, ndvi) = tokio::join!(
            self.soil.soil_summary(at),
            self.weather.precipitation_summary(at, today),
            self.elevation.terrain_summary(at),
            self.ndvi.ndvi_summary(at),
        );

        let soilgrids = soil.unwrap_or_else(|e| {
            tracing::warn!(source = "soilgrids", error = %e, "Soil data unavailable, using placeholders");
            SoilSummary::unavailable()
        });

        let precipitation = weather.unwrap_or_else(|e| {
            tracing::warn!(source = "open_meteo", error = %e, "Weather data unavailable, using defaults");
            PrecipitationSummary::unavailable()
        });

        let dem = terrain.unwrap_or_else(|e| {
            tracing::warn!(source = "elevation", error = %e, "Elevation unavailable, using defaults");
            TerrainSummary::unavailable()
        });

        let ndvi = ndvi.unwrap_or_else(|e| {
            tracing::warn!(source = "agromonitoring", error = %e, "NDVI pipeline failed, using simulated value");
            NdviSummary::simulated(simulated_ndvi())
        });

        tracing::debug!(
            lat = at.latitude,
            lon = at.longitude,
            ndvi = ?ndvi.provenance,
            "Geodata context assembled"
        );

        GeoDataContext {
            lat: at.latitude,
            lon: at.longitude,
            soilgrids,
            precipitation,
            ndvi,
            dem,
            crop_hint: crop_hint.to_string(),
        }
    }
}
