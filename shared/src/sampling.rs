//! Sampling point generation
//!
//! Candidates are laid on a regular grid over the parcel's bounding box, kept
//! when they fall inside the boundary and clear of the edge buffer, ordered
//! north to south, then split into one contiguous chunk per zone. Each zone
//! takes an evenly strided subset of its chunk.
//!
//! The edge buffer is measured to boundary *vertices*, not edges, so points
//! near the middle of a long edge can sit closer to the boundary than the
//! buffer. This approximation is kept as is; see
//! `vertex_buffer_does_not_cover_long_edges` in the tests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{min_vertex_distance_meters, point_in_polygon, BoundingBox};
use crate::models::{point_label, Parcel, PointStatus, PositionState, SamplingPoint, Zone};
use crate::types::GpsCoordinates;
use crate::validation::DomainError;

/// Grid step in degrees on both axes, about 30 m at mid latitudes
pub const DEFAULT_GRID_STEP_DEGREES: f64 = 0.00027;

/// Minimum distance from any boundary vertex, meters
pub const DEFAULT_EDGE_BUFFER_METERS: f64 = 15.0;

/// Tunables for candidate generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub grid_step_degrees: f64,
    pub edge_buffer_meters: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            grid_step_degrees: DEFAULT_GRID_STEP_DEGREES,
            edge_buffer_meters: DEFAULT_EDGE_BUFFER_METERS,
        }
    }
}

/// True when `point` is inside the boundary and at least the buffer away
/// from every vertex
pub fn is_valid_sampling_position(
    point: &GpsCoordinates,
    boundary: &[GpsCoordinates],
    edge_buffer_meters: f64,
) -> bool {
    check_sampling_position(point, boundary, edge_buffer_meters).is_ok()
}

/// Same rule as candidate filtering, with the reason when it fails
pub fn check_sampling_position(
    point: &GpsCoordinates,
    boundary: &[GpsCoordinates],
    edge_buffer_meters: f64,
) -> Result<(), DomainError> {
    if !point_in_polygon(point, boundary) {
        return Err(DomainError::OutsideBoundary);
    }
    if min_vertex_distance_meters(point, boundary) < edge_buffer_meters {
        return Err(DomainError::InsideEdgeBuffer {
            buffer_meters: edge_buffer_meters,
        });
    }
    Ok(())
}

/// Grid candidates inside the boundary and outside the buffer, sorted by
/// descending latitude.
///
/// Rows and columns are computed as `min + i * step` rather than by repeated
/// addition, so the last row does not drift past the box.
pub fn candidate_grid(boundary: &[GpsCoordinates], config: &SamplingConfig) -> Vec<GpsCoordinates> {
    let step = config.grid_step_degrees;
    if !(step.is_finite() && step > 0.0) || boundary.len() < 3 {
        return Vec::new();
    }
    let Some(bbox) = BoundingBox::of(boundary) else {
        return Vec::new();
    };

    let rows = ((bbox.max_lat - bbox.min_lat) / step).floor() as usize;
    let cols = ((bbox.max_lon - bbox.min_lon) / step).floor() as usize;

    let mut candidates = Vec::new();
    for row in 0..=rows {
        let lat = bbox.min_lat + row as f64 * step;
        for col in 0..=cols {
            let lon = bbox.min_lon + col as f64 * step;
            let candidate = GpsCoordinates::new(lat, lon);
            if is_valid_sampling_position(&candidate, boundary, config.edge_buffer_meters) {
                candidates.push(candidate);
            }
        }
    }

    candidates.sort_by(|a, b| b.latitude.total_cmp(&a.latitude));
    candidates
}

/// Evenly strided indices into a chunk of `len` candidates.
///
/// Takes `min(needed, len)` indices with `stride = max(1, len / needed)`.
/// Because the count is capped at `len`, the indices never wrap around and
/// every returned index is distinct.
pub fn stride_indices(len: usize, needed: usize) -> Vec<usize> {
    if len == 0 || needed == 0 {
        return Vec::new();
    }
    let stride = (len / needed).max(1);
    (0..needed.min(len)).map(|i| (i * stride) % len).collect()
}

/// Generate sampling points for every zone of the parcel.
///
/// Best effort: a zone whose chunk is empty contributes no points, so the
/// total can be less than the sum of quotas. Labels run `P-01`, `P-02`, ...
/// across all zones in zone order.
pub fn generate_sampling_points(
    parcel: &Parcel,
    zones: &[Zone],
    config: &SamplingConfig,
) -> Vec<SamplingPoint> {
    if zones.is_empty() {
        return Vec::new();
    }

    let candidates = candidate_grid(&parcel.boundary, config);
    let chunk_size = candidates.len().div_ceil(zones.len());

    let mut points = Vec::new();
    for (zone_index, zone) in zones.iter().enumerate() {
        let start = (zone_index * chunk_size).min(candidates.len());
        let end = (start + chunk_size).min(candidates.len());
        let chunk = &candidates[start..end];

        for index in stride_indices(chunk.len(), zone.recommended_points as usize) {
            let coord = chunk[index];
            points.push(SamplingPoint {
                id: Uuid::new_v4(),
                zone_id: zone.id,
                parcel_id: parcel.id,
                lat: coord.latitude,
                lon: coord.longitude,
                label: point_label(points.len() + 1),
                status: PointStatus::Pending,
                position: PositionState::Generated,
                analysis_result_id: None,
            });
        }
    }

    points
}
