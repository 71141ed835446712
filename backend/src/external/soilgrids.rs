//! SoilGrids client for soil composition by coordinate
//!
//! Integrates with the ISRIC SoilGrids v2 properties query. Raw values are
//! integers scaled by 10 (clay, sand, silt in g/kg -> %, pH x10, SOC in dg/kg,
//! bulk density in cg/cm3).

use std::collections::BTreeMap;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{GpsCoordinates, SoilDepthReading, SoilSummary, SourceStatus, TextureClass};

use super::{ensure_success, http_client, SourceError};
use crate::services::geodata::SoilSource;

const PROPERTIES: &str = "clay,sand,silt,soc,bdod,phh2o";

/// Depth bands requested and reported, top first
pub const DEPTHS: [&str; 3] = ["0-5cm", "5-15cm", "15-30cm"];

/// SoilGrids API client
#[derive(Clone)]
pub struct SoilGridsClient {
    client: Client,
    base_url: String,
}

/// SoilGrids properties query response
#[derive(Debug, Deserialize)]
pub struct SoilGridsResponse {
    properties: SoilGridsProperties,
}

#[derive(Debug, Deserialize)]
struct SoilGridsProperties {
    layers: Vec<SoilGridsLayer>,
}

#[derive(Debug, Deserialize)]
struct SoilGridsLayer {
    name: String,
    depths: Vec<SoilGridsDepth>,
}

#[derive(Debug, Deserialize)]
struct SoilGridsDepth {
    label: String,
    values: SoilGridsValues,
}

#[derive(Debug, Deserialize)]
struct SoilGridsValues {
    mean: Option<f64>,
}

impl SoilGridsResponse {
    /// Mean value of `property` at `depth`, divided by 10
    fn value(&self, property: &str, depth: &str) -> Option<f64> {
        self.properties
            .layers
            .iter()
            .find(|l| l.name == property)?
            .depths
            .iter()
            .find(|d| d.label == depth)?
            .values
            .mean
            .map(|raw| raw / 10.0)
    }

    fn reading(&self, depth: &str) -> SoilDepthReading {
        SoilDepthReading {
            sand: self.value("sand", depth),
            silt: self.value("silt", depth),
            clay: self.value("clay", depth),
            soc: self.value("soc", depth),
            bdod: self.value("bdod", depth),
            ph: self.value("phh2o", depth),
        }
    }
}

fn rounded(value: Option<f64>, dp: u32) -> Option<Decimal> {
    value
        .and_then(Decimal::from_f64_retain)
        .map(|d| d.round_dp(dp))
}

/// Build the soil block from a SoilGrids response.
///
/// Headline values come from the top band; texture needs all of clay, sand,
/// and silt there.
pub fn summarize_soil(response: &SoilGridsResponse) -> SoilSummary {
    let depths: BTreeMap<String, SoilDepthReading> = DEPTHS
        .iter()
        .map(|d| (d.to_string(), response.reading(d)))
        .collect();

    let top = response.reading(DEPTHS[0]);

    SoilSummary {
        texture_class: TextureClass::classify(top.clay, top.sand, top.silt),
        organic_carbon_g_kg: rounded(top.soc, 1),
        // raw cg/cm3 x 10 = kg/m3
        bulk_density_kg_m3: rounded(top.bdod.map(|b| b * 100.0), 0),
        ph: rounded(top.ph, 1),
        depths,
        status: SourceStatus::Live,
    }
}

impl SoilGridsClient {
    /// Create a new SoilGridsClient
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url,
        }
    }

    /// Fetch the raw properties query for a point
    pub async fn query(&self, at: GpsCoordinates) -> Result<SoilGridsResponse, SourceError> {
        let url = format!("{}/properties/query", self.base_url);
        let depths = DEPTHS.join(",");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("properties", PROPERTIES.to_string()),
                ("depths", depths),
                ("value", "mean".to_string()),
            ])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }
}

#[axum::async_trait]
impl SoilSource for SoilGridsClient {
    async fn soil_summary(&self, at: GpsCoordinates) -> Result<SoilSummary, SourceError> {
        let response = self.query(at).await?;
        Ok(summarize_soil(&response))
    }
}
