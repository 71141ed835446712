//! Management zone models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vigor cluster within one parcel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    pub id: Uuid,
    pub parcel_id: Uuid,
    /// e.g. "Zone A - High vigor"
    pub name: String,
    /// e.g. "High NDVI, deep soil"
    pub characteristics: String,
    /// Hex color for map display
    pub color: String,
    /// Number of sampling points to place in this zone, always at least 1
    pub recommended_points: u32,
}
