//! Shared domain for the TeraLab field sampling platform
//!
//! Geometry, zone delineation, sampling plan generation, and the data model
//! shared between the backend and the browser client (via WASM). Nothing in
//! this crate performs I/O.

pub mod geometry;
pub mod models;
pub mod sampling;
pub mod types;
pub mod validation;
pub mod zoning;

pub use models::*;
pub use types::*;
pub use validation::*;

use sampling::{generate_sampling_points, SamplingConfig};
use zoning::ZoneDelineationStrategy;

/// Zones and points generated for one parcel
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SamplingPlan {
    pub parcel: Parcel,
    pub zones: Vec<Zone>,
    pub points: Vec<SamplingPoint>,
}

/// Delineate zones with `strategy`, then place points in them
pub fn build_sampling_plan(
    parcel: Parcel,
    strategy: &dyn ZoneDelineationStrategy,
    config: &SamplingConfig,
) -> SamplingPlan {
    let zones = strategy.delineate(&parcel);
    let points = generate_sampling_points(&parcel, &zones, config);
    SamplingPlan {
        parcel,
        zones,
        points,
    }
}
