//! In-memory fakes shared by the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{
    AnalysisInput, FieldCampaign, GeoDataContext, GpsCoordinates, NdviSample, NdviSummary,
    PointAnalysis, PrecipitationSummary, SampleImages, SoilSummary, SourceStatus, TerrainSummary,
    TextureClass,
};
use teralab_backend::config::{
    AgroMonitoringConfig, AnalysisConfig, AuthConfig, Config, DatabaseConfig, OpenMeteoConfig,
    SamplingSettings, ServerConfig, SoilGridsConfig, VisionConfig,
};
use teralab_backend::error::{AppError, AppResult};
use teralab_backend::external::SourceError;
use teralab_backend::services::geodata::{
    ElevationSource, GeoDataAggregator, NdviSource, SoilSource, WeatherSource,
};
use teralab_backend::services::VisionAnalyzer;

pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Square parcel with its south-west corner at (lat, lon)
pub fn square(lat: f64, lon: f64, side_m: f64) -> Vec<GpsCoordinates> {
    let dlat = side_m / METERS_PER_DEGREE;
    let dlon = side_m / (METERS_PER_DEGREE * lat.to_radians().cos());
    vec![
        GpsCoordinates::new(lat, lon),
        GpsCoordinates::new(lat, lon + dlon),
        GpsCoordinates::new(lat + dlat, lon + dlon),
        GpsCoordinates::new(lat + dlat, lon),
    ]
}

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/teralab_test".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
        },
        soilgrids: SoilGridsConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
        },
        open_meteo: OpenMeteoConfig {
            forecast_url: "http://127.0.0.1:9/forecast".to_string(),
            elevation_url: "http://127.0.0.1:9/elevation".to_string(),
            timeout_secs: 1,
        },
        agromonitoring: AgroMonitoringConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            timeout_secs: 1,
        },
        vision: VisionConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: "test".to_string(),
            model: "test-model".to_string(),
            timeout_secs: 1,
        },
        sampling: SamplingSettings::default(),
        analysis: AnalysisConfig::default(),
    }
}

// ============================================================================
// Geodata sources
// ============================================================================

pub fn down(source: &str) -> SourceError {
    SourceError::Transport(format!("{} unreachable", source))
}

pub struct FakeSoil {
    pub fail: bool,
}

#[axum::async_trait]
impl SoilSource for FakeSoil {
    async fn soil_summary(&self, _at: GpsCoordinates) -> Result<SoilSummary, SourceError> {
        if self.fail {
            return Err(down("soil"));
        }
        Ok(SoilSummary {
            texture_class: TextureClass::Loam,
            organic_carbon_g_kg: Some(Decimal::new(182, 1)),
            bulk_density_kg_m3: Some(Decimal::new(1320, 0)),
            ph: Some(Decimal::new(64, 1)),
            depths: BTreeMap::new(),
            status: SourceStatus::Live,
        })
    }
}

pub struct FakeWeather {
    pub fail: bool,
}

#[axum::async_trait]
impl WeatherSource for FakeWeather {
    async fn precipitation_summary(
        &self,
        _at: GpsCoordinates,
        _today: NaiveDate,
    ) -> Result<PrecipitationSummary, SourceError> {
        if self.fail {
            return Err(SourceError::Status {
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        Ok(PrecipitationSummary {
            sum_3d_mm: Decimal::new(42, 1),
            sum_7d_mm: Decimal::new(120, 1),
            sum_30d_mm: Decimal::new(610, 1),
            avg_temp_7d: Decimal::new(171, 1),
            et0_daily_avg: Decimal::new(38, 1),
            et0_simulated: true,
            status: SourceStatus::Live,
        })
    }
}

pub struct FakeElevation {
    pub fail: bool,
}

#[axum::async_trait]
impl ElevationSource for FakeElevation {
    async fn terrain_summary(&self, _at: GpsCoordinates) -> Result<TerrainSummary, SourceError> {
        if self.fail {
            return Err(SourceError::Parse("empty elevation array".to_string()));
        }
        Ok(TerrainSummary {
            elevation: Decimal::new(32, 0),
            slope_pct: Decimal::new(21, 1),
            aspect: "north".to_string(),
            slope_simulated: true,
            status: SourceStatus::Live,
        })
    }
}

/// How the fake NDVI pipeline answers
#[derive(Clone, Copy)]
pub enum NdviMode {
    Measured,
    NoData,
    Broken,
}

pub struct FakeNdvi {
    pub mode: NdviMode,
}

#[axum::async_trait]
impl NdviSource for FakeNdvi {
    async fn ndvi_summary(&self, _at: GpsCoordinates) -> Result<NdviSummary, SourceError> {
        match self.mode {
            NdviMode::Measured => Ok(NdviSummary::from_samples(
                &[
                    NdviSample { dt: 100, ndvi: 0.40 },
                    NdviSample { dt: 200, ndvi: 0.60 },
                    NdviSample { dt: 300, ndvi: 0.71 },
                ],
                "AgroMonitoring Sentinel-2",
            )),
            NdviMode::NoData => Ok(NdviSummary::no_data(
                "AgroMonitoring (no satellite data for this location)",
            )),
            NdviMode::Broken => Err(down("ndvi")),
        }
    }
}

/// Which geodata sources should fail
#[derive(Clone, Copy)]
pub struct Failures {
    pub soil: bool,
    pub weather: bool,
    pub elevation: bool,
    pub ndvi: NdviMode,
}

impl Default for Failures {
    fn default() -> Self {
        Self {
            soil: false,
            weather: false,
            elevation: false,
            ndvi: NdviMode::Measured,
        }
    }
}

pub fn aggregator(failures: Failures) -> GeoDataAggregator {
    GeoDataAggregator::new(
        Arc::new(FakeSoil { fail: failures.soil }),
        Arc::new(FakeWeather {
            fail: failures.weather,
        }),
        Arc::new(FakeElevation {
            fail: failures.elevation,
        }),
        Arc::new(FakeNdvi {
            mode: failures.ndvi,
        }),
    )
}

// ============================================================================
// Vision model
// ============================================================================

/// Vision fake that can be told to fail on the n-th point call (1-based)
#[derive(Default)]
pub struct FakeVision {
    pub fail_on_call: Option<usize>,
    pub fail_report: bool,
    /// Per-point latency, to keep a batch running while other requests arrive
    pub latency: Option<std::time::Duration>,
    pub calls: AtomicUsize,
}

impl FakeVision {
    pub fn slow(millis: u64) -> Self {
        Self {
            latency: Some(std::time::Duration::from_millis(millis)),
            ..Self::default()
        }
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[axum::async_trait]
impl VisionAnalyzer for FakeVision {
    async fn analyze_point(
        &self,
        _images: &SampleImages,
        context: &GeoDataContext,
        input: &AnalysisInput,
    ) -> AppResult<serde_json::Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(AppError::VisionModel("model overloaded".to_string()));
        }
        Ok(serde_json::json!({
            "texture": { "class": context.soilgrids.texture_class.to_string() },
            "crop": input.crop,
            "call": call,
        }))
    }

    async fn field_report(
        &self,
        campaign: &FieldCampaign,
        analyses: &[PointAnalysis],
    ) -> AppResult<serde_json::Map<String, serde_json::Value>> {
        if self.fail_report {
            return Err(AppError::VisionModel("report failed".to_string()));
        }
        let mut body = serde_json::Map::new();
        body.insert(
            "final_summary_text".to_string(),
            serde_json::json!(format!("{} points analyzed in {}", analyses.len(), campaign.parcel.name)),
        );
        Ok(body)
    }
}

/// A tiny valid base64 photo pair
pub fn photos() -> SampleImages {
    SampleImages {
        surface_image: "/9j/4AAQSkZJRg==".to_string(),
        profile_image: "data:image/jpeg;base64,/9j/4AAQSkZJRg==".to_string(),
        mime_type: "image/jpeg".to_string(),
    }
}
