//! Point analysis models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{GeoDataContext, SourcesUsed};
use crate::types::GpsCoordinates;

/// Result of analyzing one sampled point.
///
/// `result` is whatever the vision model returned (texture, organic matter,
/// compaction, recommendations, ...). It is stored verbatim next to the
/// context that was fed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointAnalysis {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub sampling_point_id: Uuid,
    pub result: serde_json::Value,
    pub geodata_context: GeoDataContext,
    pub geodata_used: SourcesUsed,
    pub original_input: AnalysisInput,
    pub timestamp: DateTime<Utc>,
}

impl PointAnalysis {
    pub fn new(
        campaign_id: Uuid,
        sampling_point_id: Uuid,
        result: serde_json::Value,
        geodata_context: GeoDataContext,
        original_input: AnalysisInput,
    ) -> Self {
        let geodata_used = geodata_context.sources_used();
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            sampling_point_id,
            result,
            geodata_context,
            geodata_used,
            original_input,
            timestamp: Utc::now(),
        }
    }
}

/// The non-image part of an analysis request, kept for traceability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisInput {
    pub parcel_name: String,
    pub crop: String,
    #[serde(default)]
    pub notes: String,
    pub location: Option<GpsCoordinates>,
}

/// Photo pair captured at a point, base64 encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleImages {
    /// Top-down photo of the soil surface
    pub surface_image: String,
    /// Photo of the dug profile
    pub profile_image: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    "image/jpeg".to_string()
}
