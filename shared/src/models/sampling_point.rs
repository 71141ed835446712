//! Sampling point models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::GpsCoordinates;

/// One physical location to be photographed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplingPoint {
    pub id: Uuid,
    pub zone_id: Uuid,
    pub parcel_id: Uuid,
    pub lat: f64,
    pub lon: f64,
    /// Sequential label such as "P-01"
    pub label: String,
    pub status: PointStatus,
    /// How the current coordinates came to be
    #[serde(default)]
    pub position: PositionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_result_id: Option<Uuid>,
}

impl SamplingPoint {
    pub fn coordinates(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.lat, self.lon)
    }

    pub fn is_sampled(&self) -> bool {
        self.status == PointStatus::Sampled
    }
}

/// Sampling progress of a point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PointStatus {
    #[default]
    Pending,
    Sampled,
}

/// Provenance of a point's coordinates.
///
/// Generated points satisfy the in-polygon and edge-buffer rules. A manual
/// drag either re-checks those rules (`Adjusted`) or skips them
/// (`Unvalidated`), depending on configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    #[default]
    Generated,
    Adjusted,
    Unvalidated,
}

/// Format a point label: `P-01`, `P-02`, ..., `P-100`
pub fn point_label(sequence: usize) -> String {
    format!("P-{:02}", sequence)
}
