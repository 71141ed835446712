//! Open-Meteo client for daily weather history and point elevation
//!
//! Neither endpoint needs a key. Evapotranspiration, slope, and aspect are
//! not derived from real models yet; they are filled with bounded random
//! values and flagged as simulated.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{GpsCoordinates, PrecipitationSummary, SourceStatus, TerrainSummary, ASPECT_LABELS};

use super::{ensure_success, http_client, SourceError};
use crate::services::geodata::{ElevationSource, WeatherSource};

/// Open-Meteo API client
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Client,
    forecast_url: String,
    elevation_url: String,
    past_days: i64,
}

/// Forecast endpoint response with daily series
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub daily: DailySeries,
}

/// Parallel daily arrays; any entry may be null
#[derive(Debug, Deserialize)]
pub struct DailySeries {
    pub time: Vec<NaiveDate>,
    pub precipitation_sum: Vec<Option<f64>>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    elevation: Vec<f64>,
}

/// Fallback 7-day mean temperature when no day in the window has both extremes
const DEFAULT_AVG_TEMP: f64 = 20.0;

fn decimal_1dp(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp(1)
}

/// Reduce the daily series to trailing-window sums and a 7-day mean temperature.
///
/// Days after `today` (forecast days) are ignored. The 3-day sum is the last
/// three days up to and including today; the 7- and 30-day windows hold the
/// seven and thirty days ending on `today`. Missing precipitation
/// counts as zero; days missing either temperature are skipped for the mean.
pub fn summarize_weather(
    daily: &DailySeries,
    today: NaiveDate,
    et0_daily_avg: f64,
) -> Result<PrecipitationSummary, SourceError> {
    let days: Vec<(NaiveDate, f64, Option<f64>)> = daily
        .time
        .iter()
        .enumerate()
        .filter(|(_, date)| **date <= today)
        .map(|(i, date)| {
            let precip = daily.precipitation_sum.get(i).copied().flatten().unwrap_or(0.0);
            let max = daily.temperature_2m_max.get(i).copied().flatten();
            let min = daily.temperature_2m_min.get(i).copied().flatten();
            let mean_temp = max.zip(min).map(|(hi, lo)| (hi + lo) / 2.0);
            (*date, precip, mean_temp)
        })
        .collect();

    if days.is_empty() {
        return Err(SourceError::Parse("daily series has no past days".to_string()));
    }

    // exclusive lower bounds: (today - N, today] is exactly N days
    let after_7d = today - Duration::days(7);
    let after_30d = today - Duration::days(30);

    let sum_3d: f64 = days.iter().rev().take(3).map(|(_, p, _)| p).sum();
    let sum_7d: f64 = days.iter().filter(|(d, _, _)| *d > after_7d).map(|(_, p, _)| p).sum();
    let sum_30d: f64 = days.iter().filter(|(d, _, _)| *d > after_30d).map(|(_, p, _)| p).sum();

    let temps: Vec<f64> = days
        .iter()
        .filter(|(d, _, _)| *d > after_7d)
        .filter_map(|(_, _, t)| *t)
        .collect();
    let avg_temp = if temps.is_empty() {
        DEFAULT_AVG_TEMP
    } else {
        temps.iter().sum::<f64>() / temps.len() as f64
    };

    Ok(PrecipitationSummary {
        sum_3d_mm: decimal_1dp(sum_3d),
        sum_7d_mm: decimal_1dp(sum_7d),
        sum_30d_mm: decimal_1dp(sum_30d),
        avg_temp_7d: decimal_1dp(avg_temp),
        et0_daily_avg: decimal_1dp(et0_daily_avg),
        et0_simulated: true,
        status: SourceStatus::Live,
    })
}

/// Terrain block from a measured elevation plus simulated slope and aspect
pub fn summarize_terrain(elevation_m: f64, slope_pct: f64, aspect: &str) -> TerrainSummary {
    TerrainSummary {
        elevation: Decimal::from_f64_retain(elevation_m)
            .unwrap_or_default()
            .round_dp(0),
        slope_pct: decimal_1dp(slope_pct),
        aspect: aspect.to_string(),
        slope_simulated: true,
        status: SourceStatus::Live,
    }
}

/// Placeholder reference evapotranspiration, mm/day in [2, 7)
fn simulated_et0() -> f64 {
    rand::thread_rng().gen_range(2.0..7.0)
}

/// Placeholder slope in [0, 15) percent and a random compass aspect
fn simulated_slope_and_aspect() -> (f64, &'static str) {
    let mut rng = rand::thread_rng();
    let slope = rng.gen_range(0.0..15.0);
    let aspect = ASPECT_LABELS[rng.gen_range(0..ASPECT_LABELS.len())];
    (slope, aspect)
}

impl OpenMeteoClient {
    /// Create a new OpenMeteoClient
    pub fn new(
        forecast_url: String,
        elevation_url: String,
        past_days: i64,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: http_client(timeout_secs),
            forecast_url,
            elevation_url,
            past_days,
        }
    }

    /// Fetch daily precipitation and temperature for the trailing window
    pub async fn daily_history(&self, at: GpsCoordinates) -> Result<ForecastResponse, SourceError> {
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", at.latitude.to_string()),
                ("longitude", at.longitude.to_string()),
                (
                    "daily",
                    "precipitation_sum,temperature_2m_max,temperature_2m_min".to_string(),
                ),
                ("timezone", "auto".to_string()),
                ("past_days", self.past_days.to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch the elevation of a single point, meters
    pub async fn elevation(&self, at: GpsCoordinates) -> Result<f64, SourceError> {
        let response = self
            .client
            .get(&self.elevation_url)
            .query(&[
                ("latitude", at.latitude.to_string()),
                ("longitude", at.longitude.to_string()),
            ])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let data: ElevationResponse = response.json().await?;
        data.elevation
            .first()
            .copied()
            .ok_or_else(|| SourceError::Parse("empty elevation array".to_string()))
    }
}

#[axum::async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn precipitation_summary(
        &self,
        at: GpsCoordinates,
        today: NaiveDate,
    ) -> Result<PrecipitationSummary, SourceError> {
        let history = self.daily_history(at).await?;
        summarize_weather(&history.daily, today, simulated_et0())
    }
}

#[axum::async_trait]
impl ElevationSource for OpenMeteoClient {
    async fn terrain_summary(&self, at: GpsCoordinates) -> Result<TerrainSummary, SourceError> {
        let elevation = self.elevation(at).await?;
        let (slope, aspect) = simulated_slope_and_aspect();
        Ok(summarize_terrain(elevation, slope, aspect))
    }
}
