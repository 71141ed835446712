//! Geodata aggregation integration tests
//!
//! Each source degrades on its own and the context keeps its full shape.

mod common;

use chrono::{Duration, NaiveDate};
use common::{aggregator, Failures, NdviMode};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    GpsCoordinates, NdviProvenance, NdviSample, NdviSummary, PrecipitationSummary, SoilSummary,
    SourceStatus, TerrainSummary, SIMULATED_NDVI_MEAN,
};
use teralab_backend::external::open_meteo::{summarize_weather, DailySeries};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
}

fn point() -> GpsCoordinates {
    GpsCoordinates::new(-34.6037, -58.3816)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_all_sources_live() {
        let ctx = aggregator(Failures::default())
            .fetch_on(point(), "soy", today())
            .await;

        let used = ctx.sources_used();
        assert!(used.soilgrids && used.precipitation && used.ndvi && used.dem);
        assert_eq!(ctx.crop_hint, "soy");
        assert_eq!(ctx.lat, -34.6037);
        assert_eq!(ctx.ndvi.provenance, NdviProvenance::Measured);
        assert_eq!(ctx.ndvi.current, Some(0.71));
    }

    #[tokio::test]
    async fn test_soil_failure_leaves_placeholders() {
        let ctx = aggregator(Failures {
            soil: true,
            ..Failures::default()
        })
        .fetch_on(point(), "soy", today())
        .await;

        assert_eq!(ctx.soilgrids, SoilSummary::unavailable());
        assert_eq!(ctx.precipitation.status, SourceStatus::Live);
        assert!(!ctx.sources_used().soilgrids);

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["soilgrids"]["ph"], "N/A");
        assert_eq!(json["soilgrids"]["organic_carbon_g_kg"], "N/A");
    }

    #[tokio::test]
    async fn test_weather_failure_uses_numeric_defaults() {
        let ctx = aggregator(Failures {
            weather: true,
            ..Failures::default()
        })
        .fetch_on(point(), "soy", today())
        .await;

        assert_eq!(ctx.precipitation, PrecipitationSummary::unavailable());
        assert_eq!(ctx.soilgrids.status, SourceStatus::Live);
    }

    #[tokio::test]
    async fn test_elevation_failure_uses_defaults() {
        let ctx = aggregator(Failures {
            elevation: true,
            ..Failures::default()
        })
        .fetch_on(point(), "soy", today())
        .await;

        assert_eq!(ctx.dem, TerrainSummary::unavailable());
        assert_eq!(ctx.dem.aspect, "unknown");
        assert!(!ctx.sources_used().dem);
    }

    #[tokio::test]
    async fn test_ndvi_no_data_is_null_not_simulated() {
        let ctx = aggregator(Failures {
            ndvi: NdviMode::NoData,
            ..Failures::default()
        })
        .fetch_on(point(), "soy", today())
        .await;

        assert_eq!(ctx.ndvi.provenance, NdviProvenance::NoDataAvailable);
        assert!(ctx.ndvi.current.is_none());
        assert!(ctx.ndvi.historical_mean.is_none());
        assert!(ctx.ndvi.anomaly.is_none());
    }

    #[tokio::test]
    async fn test_ndvi_pipeline_failure_is_simulated() {
        let ctx = aggregator(Failures {
            ndvi: NdviMode::Broken,
            ..Failures::default()
        })
        .fetch_on(point(), "soy", today())
        .await;

        assert_eq!(ctx.ndvi.provenance, NdviProvenance::SimulatedFallback);
        assert!(ctx.ndvi.source.contains("simulated"));
        assert_eq!(ctx.ndvi.historical_mean, Some(SIMULATED_NDVI_MEAN));
        assert!(!ctx.sources_used().ndvi);
    }

    #[tokio::test]
    async fn test_everything_down_still_has_every_key() {
        let ctx = aggregator(Failures {
            soil: true,
            weather: true,
            elevation: true,
            ndvi: NdviMode::Broken,
        })
        .fetch_on(point(), "maize", today())
        .await;

        let json = serde_json::to_value(&ctx).unwrap();
        for key in ["lat", "lon", "soilgrids", "precipitation", "ndvi", "dem", "crop_hint"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        for key in ["3d_sum_mm", "7d_sum_mm", "30d_sum_mm", "avg_temp_7d", "et0_daily_avg"] {
            assert!(json["precipitation"][key].is_number(), "{} should be a number", key);
        }
        assert!(json["dem"]["elevation"].is_number());
        assert!(json["dem"]["slope_pct"].is_number());

        let used = ctx.sources_used();
        assert!(!used.soilgrids && !used.precipitation && !used.ndvi && !used.dem);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

/// Past days ending on `today`, oldest first, with the given rainfall
fn past_days(today: NaiveDate, rain_mm: &[u32]) -> DailySeries {
    let n = rain_mm.len();
    DailySeries {
        time: (0..n)
            .map(|i| today - Duration::days((n - 1 - i) as i64))
            .collect(),
        precipitation_sum: rain_mm.iter().map(|mm| Some(f64::from(*mm))).collect(),
        temperature_2m_max: vec![Some(24.0); n],
        temperature_2m_min: vec![Some(12.0); n],
    }
}

fn trailing_sum(rain_mm: &[u32], days: usize) -> Decimal {
    Decimal::from(rain_mm.iter().rev().take(days).sum::<u32>())
}

fn ndvi_samples() -> impl Strategy<Value = Vec<NdviSample>> {
    prop::collection::vec(
        (0i64..10_000_000, -0.2f64..1.0).prop_map(|(dt, ndvi)| NdviSample { dt, ndvi }),
        1..40,
    )
}

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Each window sums exactly its own number of days ending today
        #[test]
        fn prop_weather_windows_hold_their_length(rain in prop::collection::vec(0u32..50, 1..60)) {
            let summary = summarize_weather(&past_days(today(), &rain), today(), 3.0).unwrap();

            prop_assert_eq!(summary.sum_3d_mm, trailing_sum(&rain, 3));
            prop_assert_eq!(summary.sum_7d_mm, trailing_sum(&rain, 7));
            prop_assert_eq!(summary.sum_30d_mm, trailing_sum(&rain, 30));
            prop_assert_eq!(summary.avg_temp_7d, Decimal::from(18));
        }

        /// Anomaly is current minus mean, and current is the latest sample
        #[test]
        fn prop_ndvi_anomaly_is_current_minus_mean(samples in ndvi_samples()) {
            let summary = NdviSummary::from_samples(&samples, "AgroMonitoring Sentinel-2");
            let latest_dt = samples.iter().map(|s| s.dt).max().unwrap();

            let current = summary.current.unwrap();
            let mean = summary.historical_mean.unwrap();
            prop_assert!(samples.iter().any(|s| s.dt == latest_dt && s.ndvi == current));
            prop_assert!((summary.anomaly.unwrap() - (current - mean)).abs() < 1e-9);

            let lo = samples.iter().map(|s| s.ndvi).fold(f64::INFINITY, f64::min);
            let hi = samples.iter().map(|s| s.ndvi).fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(mean >= lo - 1e-9 && mean <= hi + 1e-9);
            prop_assert_eq!(summary.provenance, NdviProvenance::Measured);
        }

        /// The simulated fallback stays plausible and keeps the anomaly consistent
        #[test]
        fn prop_simulated_ndvi_is_consistent(current in 0.25f64..=0.65) {
            let summary = NdviSummary::simulated(current);
            prop_assert_eq!(summary.provenance, NdviProvenance::SimulatedFallback);
            prop_assert!((summary.anomaly.unwrap() - (current - SIMULATED_NDVI_MEAN)).abs() < 1e-12);
        }
    }

    #[tokio::test]
    async fn test_aggregated_ndvi_block_is_consistent_in_every_mode() {
        for mode in [NdviMode::Measured, NdviMode::NoData, NdviMode::Broken] {
            let ctx = aggregator(Failures {
                ndvi: mode,
                ..Failures::default()
            })
            .fetch_on(point(), "soy", today())
            .await;

            match (ctx.ndvi.current, ctx.ndvi.historical_mean, ctx.ndvi.anomaly) {
                (Some(current), Some(mean), Some(anomaly)) => {
                    assert!((anomaly - (current - mean)).abs() < 1e-9);
                }
                (None, None, None) => {
                    assert_eq!(ctx.ndvi.provenance, NdviProvenance::NoDataAvailable)
                }
                other => panic!("inconsistent NDVI block: {:?}", other),
            }
        }
    }
}
