//! Field parcel models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{centroid, polygon_area_hectares};
use crate::types::GpsCoordinates;

/// A user-drawn field boundary and its metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parcel {
    pub id: Uuid,
    pub name: String,
    pub crop: String,
    #[serde(default)]
    pub stage: GrowthStage,
    /// Derived from the boundary, never user-entered
    pub area_hectares: f64,
    /// Ordered ring of `[lat, lon]` vertices, implicitly closed
    pub boundary: Vec<GpsCoordinates>,
    /// Vertex centroid, derived from the boundary
    pub centroid: GpsCoordinates,
    pub created_at: DateTime<Utc>,
}

impl Parcel {
    /// Build a parcel from a finalized boundary, deriving area and centroid
    pub fn new(
        name: impl Into<String>,
        crop: impl Into<String>,
        stage: GrowthStage,
        boundary: Vec<GpsCoordinates>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), name, crop, stage, boundary)
    }

    /// Same as [`Parcel::new`] but keeps an existing identifier.
    ///
    /// Used by the edit-and-resave flow, which re-derives geometry for an
    /// edited boundary while the parcel keeps its identity.
    pub fn with_id(
        id: Uuid,
        name: impl Into<String>,
        crop: impl Into<String>,
        stage: GrowthStage,
        boundary: Vec<GpsCoordinates>,
    ) -> Self {
        let area_hectares = polygon_area_hectares(&boundary);
        let centroid = centroid(&boundary);
        Self {
            id,
            name: name.into(),
            crop: crop.into(),
            stage,
            area_hectares,
            boundary,
            centroid,
            created_at: Utc::now(),
        }
    }
}

/// Crop growth stage the field is sampled in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    /// Soil preparation before sowing
    Preparation,
    /// Established crop
    #[default]
    Production,
}

impl std::fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrowthStage::Preparation => write!(f, "preparation"),
            GrowthStage::Production => write!(f, "production"),
        }
    }
}

/// One row of the parcel list: a parcel with its latest campaign state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelSummary {
    pub id: Uuid,
    pub name: String,
    pub crop: String,
    pub area_hectares: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_campaign_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_campaign_status: Option<crate::models::CampaignStatus>,
    pub sampled_points_count: usize,
    pub total_points_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parcel_derives_geometry() {
        let boundary = vec![
            GpsCoordinates::new(0.0, 0.0),
            GpsCoordinates::new(0.0, 0.001),
            GpsCoordinates::new(0.001, 0.001),
            GpsCoordinates::new(0.001, 0.0),
        ];
        let parcel = Parcel::new("Lote Norte", "maize", GrowthStage::Production, boundary);
        assert!(parcel.area_hectares > 1.0 && parcel.area_hectares < 1.3);
        assert!((parcel.centroid.latitude - 0.0005).abs() < 1e-12);
        assert!((parcel.centroid.longitude - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn test_stage_defaults_to_production() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "name": "Lote",
            "crop": "soy",
            "area_hectares": 0.0,
            "boundary": [],
            "centroid": [0.0, 0.0],
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let parcel: Parcel = serde_json::from_str(json).unwrap();
        assert_eq!(parcel.stage, GrowthStage::Production);
    }
}
