//! Environmental context models
//!
//! A [`GeoDataContext`] bundles soil, weather, terrain, and vegetation signals
//! for a single coordinate. Each block degrades on its own: a failed source
//! leaves an explicit placeholder in its block and never removes a key.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::na_string;

/// Normalized environmental context for one coordinate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoDataContext {
    pub lat: f64,
    pub lon: f64,
    pub soilgrids: SoilSummary,
    pub precipitation: PrecipitationSummary,
    pub ndvi: NdviSummary,
    pub dem: TerrainSummary,
    pub crop_hint: String,
}

impl GeoDataContext {
    /// Which blocks carry live data rather than placeholders
    pub fn sources_used(&self) -> SourcesUsed {
        SourcesUsed {
            soilgrids: self.soilgrids.status == SourceStatus::Live,
            precipitation: self.precipitation.status == SourceStatus::Live,
            ndvi: self.ndvi.provenance == NdviProvenance::Measured,
            dem: self.dem.status == SourceStatus::Live,
        }
    }
}

/// Per-source availability flags
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourcesUsed {
    pub soilgrids: bool,
    pub precipitation: bool,
    pub ndvi: bool,
    pub dem: bool,
}

/// Whether a block came from its service or from fallback placeholders
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Live,
    Unavailable,
}

// ============================================================================
// Soil
// ============================================================================

/// Soil composition summary (top layer headline values plus per-depth detail)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoilSummary {
    pub texture_class: TextureClass,
    #[serde(with = "na_string")]
    pub organic_carbon_g_kg: Option<Decimal>,
    #[serde(with = "na_string")]
    pub bulk_density_kg_m3: Option<Decimal>,
    #[serde(with = "na_string")]
    pub ph: Option<Decimal>,
    /// Keyed by depth label, e.g. "0-5cm"
    pub depths: BTreeMap<String, SoilDepthReading>,
    pub status: SourceStatus,
}

impl SoilSummary {
    /// Placeholder block used when the soil service cannot be reached
    pub fn unavailable() -> Self {
        Self {
            texture_class: TextureClass::Unknown,
            organic_carbon_g_kg: None,
            bulk_density_kg_m3: None,
            ph: None,
            depths: BTreeMap::new(),
            status: SourceStatus::Unavailable,
        }
    }
}

/// Soil properties at one depth band, in conventional units
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SoilDepthReading {
    /// Percent
    pub sand: Option<f64>,
    /// Percent
    pub silt: Option<f64>,
    /// Percent
    pub clay: Option<f64>,
    /// Soil organic carbon, g/kg
    pub soc: Option<f64>,
    /// Bulk density, cg/cm3
    pub bdod: Option<f64>,
    pub ph: Option<f64>,
}

/// Simplified soil texture classes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TextureClass {
    Clayey,
    Sandy,
    Silty,
    ClayLoam,
    SandyLoam,
    Loam,
    Unknown,
}

impl TextureClass {
    /// Decision table over clay/sand/silt percentages; first match wins
    pub fn classify(clay: Option<f64>, sand: Option<f64>, silt: Option<f64>) -> Self {
        let (Some(clay), Some(sand), Some(silt)) = (clay, sand, silt) else {
            return TextureClass::Unknown;
        };

        if clay > 40.0 {
            TextureClass::Clayey
        } else if sand > 70.0 {
            TextureClass::Sandy
        } else if silt > 60.0 {
            TextureClass::Silty
        } else if clay > 20.0 && sand < 50.0 {
            TextureClass::ClayLoam
        } else if sand > 50.0 && clay < 20.0 {
            TextureClass::SandyLoam
        } else {
            TextureClass::Loam
        }
    }
}

impl std::fmt::Display for TextureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TextureClass::Clayey => "clayey",
            TextureClass::Sandy => "sandy",
            TextureClass::Silty => "silty",
            TextureClass::ClayLoam => "clay-loam",
            TextureClass::SandyLoam => "sandy-loam",
            TextureClass::Loam => "loam",
            TextureClass::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Precipitation / temperature
// ============================================================================

/// Trailing-window rainfall and temperature summary.
///
/// Numeric fields go on the wire as JSON numbers, placeholders included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrecipitationSummary {
    #[serde(rename = "3d_sum_mm", with = "rust_decimal::serde::float")]
    pub sum_3d_mm: Decimal,
    #[serde(rename = "7d_sum_mm", with = "rust_decimal::serde::float")]
    pub sum_7d_mm: Decimal,
    #[serde(rename = "30d_sum_mm", with = "rust_decimal::serde::float")]
    pub sum_30d_mm: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_temp_7d: Decimal,
    /// Reference evapotranspiration, mm/day. Simulated: no ET0 model is wired in.
    #[serde(with = "rust_decimal::serde::float")]
    pub et0_daily_avg: Decimal,
    pub et0_simulated: bool,
    pub status: SourceStatus,
}

impl PrecipitationSummary {
    /// Numeric defaults used when the weather service fails
    pub fn unavailable() -> Self {
        Self {
            sum_3d_mm: Decimal::ZERO,
            sum_7d_mm: Decimal::ZERO,
            sum_30d_mm: Decimal::ZERO,
            avg_temp_7d: Decimal::new(200, 1),
            et0_daily_avg: Decimal::new(35, 1),
            et0_simulated: true,
            status: SourceStatus::Unavailable,
        }
    }
}

// ============================================================================
// Terrain
// ============================================================================

/// Elevation, slope, and aspect at the point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerrainSummary {
    /// Meters above sea level
    #[serde(with = "rust_decimal::serde::float")]
    pub elevation: Decimal,
    /// Simulated until a DEM slope pipeline is integrated
    #[serde(with = "rust_decimal::serde::float")]
    pub slope_pct: Decimal,
    /// Compass label; simulated like slope
    pub aspect: String,
    pub slope_simulated: bool,
    pub status: SourceStatus,
}

impl TerrainSummary {
    pub fn unavailable() -> Self {
        Self {
            elevation: Decimal::ZERO,
            slope_pct: Decimal::ZERO,
            aspect: "unknown".to_string(),
            slope_simulated: false,
            status: SourceStatus::Unavailable,
        }
    }
}

/// The eight compass labels used for aspect
pub const ASPECT_LABELS: [&str; 8] = [
    "north",
    "northeast",
    "east",
    "southeast",
    "south",
    "southwest",
    "west",
    "northwest",
];

// ============================================================================
// Vegetation index
// ============================================================================

/// How the NDVI block was obtained.
///
/// `NoDataAvailable` and `SimulatedFallback` are deliberately distinct: the
/// first carries nulls because the satellite had nothing to say, the second
/// carries a made-up plausible value because the pipeline itself broke.
/// Reports must disclose which one occurred.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NdviProvenance {
    Measured,
    NoDataAvailable,
    SimulatedFallback,
}

/// Vegetation index summary over the trailing window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NdviSummary {
    pub current: Option<f64>,
    pub historical_mean: Option<f64>,
    pub anomaly: Option<f64>,
    /// Human-readable provenance, e.g. "AgroMonitoring Sentinel-2"
    pub source: String,
    pub provenance: NdviProvenance,
}

/// One NDVI observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NdviSample {
    /// Unix timestamp, seconds
    pub dt: i64,
    /// Mean NDVI over the polygon
    pub ndvi: f64,
}

/// Fixed historical mean reported alongside a simulated current value
pub const SIMULATED_NDVI_MEAN: f64 = 0.55;

impl NdviSummary {
    /// Current = most recent sample, mean over all samples, anomaly = current - mean.
    ///
    /// An empty window is reported as "no data", never as zero.
    pub fn from_samples(samples: &[NdviSample], source: impl Into<String>) -> Self {
        let Some(latest) = samples.iter().max_by_key(|s| s.dt) else {
            return Self::no_data("no satellite data for this window");
        };

        let mean = samples.iter().map(|s| s.ndvi).sum::<f64>() / samples.len() as f64;

        Self {
            current: Some(latest.ndvi),
            historical_mean: Some(mean),
            anomaly: Some(latest.ndvi - mean),
            source: source.into(),
            provenance: NdviProvenance::Measured,
        }
    }

    /// Explicit nulls with a reason
    pub fn no_data(reason: impl Into<String>) -> Self {
        Self {
            current: None,
            historical_mean: None,
            anomaly: None,
            source: reason.into(),
            provenance: NdviProvenance::NoDataAvailable,
        }
    }

    /// Plausible made-up value, clearly tagged as simulated
    pub fn simulated(current: f64) -> Self {
        Self {
            current: Some(current),
            historical_mean: Some(SIMULATED_NDVI_MEAN),
            anomaly: Some(current - SIMULATED_NDVI_MEAN),
            source: "Sentinel-2 (simulated fallback)".to_string(),
            provenance: NdviProvenance::SimulatedFallback,
        }
    }
}
