//! Management zone delineation
//!
//! Downstream code depends only on the output contract: an ordered list of
//! zones, each with a point quota. How the zones are found is a strategy.
//! [`FixedArchetypeStrategy`] stands in for real clustering of vigor rasters
//! (k-means over per-pixel NDVI and slope) until such data is wired in.

use uuid::Uuid;

use crate::models::{Parcel, Zone};

/// Parcels larger than this get three zones instead of two
pub const LARGE_PARCEL_THRESHOLD_HECTARES: f64 = 5.0;

/// Partition a parcel into management zones
pub trait ZoneDelineationStrategy: Send + Sync {
    fn delineate(&self, parcel: &Parcel) -> Vec<Zone>;
}

/// Named zone template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneArchetype {
    pub name: &'static str,
    pub characteristics: &'static str,
    pub color: &'static str,
}

/// Zone templates in descending expected vigor
pub const ZONE_ARCHETYPES: [ZoneArchetype; 3] = [
    ZoneArchetype {
        name: "Zone A - High vigor",
        characteristics: "High NDVI, deep soil",
        color: "#10b981",
    },
    ZoneArchetype {
        name: "Zone B - Medium vigor",
        characteristics: "Medium NDVI, gentle slope",
        color: "#f59e0b",
    },
    ZoneArchetype {
        name: "Zone C - Low vigor",
        characteristics: "Water stress, salinity",
        color: "#ef4444",
    },
];

/// Area-driven zone count over fixed vigor archetypes
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedArchetypeStrategy;

impl ZoneDelineationStrategy for FixedArchetypeStrategy {
    fn delineate(&self, parcel: &Parcel) -> Vec<Zone> {
        let count = zone_count_for_area(parcel.area_hectares);
        let quota = recommended_points_per_zone(parcel.area_hectares, count);

        ZONE_ARCHETYPES
            .iter()
            .take(count)
            .map(|archetype| Zone {
                id: Uuid::new_v4(),
                parcel_id: parcel.id,
                name: archetype.name.to_string(),
                characteristics: archetype.characteristics.to_string(),
                color: archetype.color.to_string(),
                recommended_points: quota,
            })
            .collect()
    }
}

/// 3 zones above the threshold, otherwise 2
pub fn zone_count_for_area(area_hectares: f64) -> usize {
    if area_hectares > LARGE_PARCEL_THRESHOLD_HECTARES {
        3
    } else {
        2
    }
}

/// `round(area / zones)`, never below 1
pub fn recommended_points_per_zone(area_hectares: f64, zone_count: usize) -> u32 {
    if zone_count == 0 {
        return 1;
    }
    // `as` saturates and maps NaN to 0, so the floor below still applies
    let rounded = (area_hectares / zone_count as f64).round() as u32;
    rounded.max(1)
}

/// Delineate with the default strategy
pub fn delineate_zones(parcel: &Parcel) -> Vec<Zone> {
    FixedArchetypeStrategy.delineate(parcel)
}
