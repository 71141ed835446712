//! Configuration management for the TeraLab backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with TERALAB__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::sampling::SamplingConfig;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Access token verification
    pub auth: AuthConfig,

    /// Soil properties service
    pub soilgrids: SoilGridsConfig,

    /// Weather and elevation services
    pub open_meteo: OpenMeteoConfig,

    /// Satellite vegetation index service
    pub agromonitoring: AgroMonitoringConfig,

    /// Vision model used for point and field analysis
    pub vision: VisionConfig,

    /// Sampling plan generation
    pub sampling: SamplingSettings,

    /// Batch analysis
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the managed backend that issues access tokens
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SoilGridsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenMeteoConfig {
    pub forecast_url: String,
    pub elevation_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgroMonitoringConfig {
    pub base_url: String,

    /// Without a key the NDVI block reports "no data" instead of calling out
    pub api_key: Option<String>,

    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VisionConfig {
    /// Model API endpoint
    pub endpoint: String,

    /// Model API key
    pub api_key: String,

    pub model: String,

    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SamplingSettings {
    pub grid_step_degrees: f64,
    pub edge_buffer_meters: f64,

    /// Re-check boundary and buffer when a point is dragged
    pub validate_adjusted_points: bool,
}

impl SamplingSettings {
    pub fn generator_config(&self) -> SamplingConfig {
        SamplingConfig {
            grid_step_degrees: self.grid_step_degrees,
            edge_buffer_meters: self.edge_buffer_meters,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Points analyzed at once; 1 keeps the batch strictly sequential
    pub max_concurrency: usize,

    /// Trailing window for weather and NDVI history, days
    pub window_days: i64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("TERALAB_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("soilgrids.base_url", "https://rest.isric.org/soilgrids/v2.0")?
            .set_default("soilgrids.timeout_secs", 20)?
            .set_default("open_meteo.forecast_url", "https://api.open-meteo.com/v1/forecast")?
            .set_default("open_meteo.elevation_url", "https://api.open-meteo.com/v1/elevation")?
            .set_default("open_meteo.timeout_secs", 15)?
            .set_default("agromonitoring.base_url", "https://api.agromonitoring.com/agro/1.0")?
            .set_default("agromonitoring.timeout_secs", 20)?
            .set_default("vision.model", "gemini-2.5-flash")?
            .set_default("vision.timeout_secs", 120)?
            .set_default("sampling.grid_step_degrees", 0.00027)?
            .set_default("sampling.edge_buffer_meters", 15.0)?
            .set_default("sampling.validate_adjusted_points", false)?
            .set_default("analysis.max_concurrency", 1)?
            .set_default("analysis.window_days", 30)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (TERALAB__ prefix)
            .add_source(
                Environment::with_prefix("TERALAB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        let defaults = SamplingConfig::default();
        Self {
            grid_step_degrees: defaults.grid_step_degrees,
            edge_buffer_meters: defaults.edge_buffer_meters,
            validate_adjusted_points: false,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            window_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_defaults_match_generator() {
        let settings = SamplingSettings::default();
        assert_eq!(settings.generator_config(), SamplingConfig::default());
        assert!(!settings.validate_adjusted_points);
    }

    #[test]
    fn test_analysis_defaults_are_sequential() {
        let analysis = AnalysisConfig::default();
        assert_eq!(analysis.max_concurrency, 1);
        assert_eq!(analysis.window_days, 30);
    }
}
