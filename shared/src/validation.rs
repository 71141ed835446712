//! Validation utilities for field boundaries and campaign input
//!
//! The geometry and plan generators never fail; they degrade to zero area or
//! zero points. These checks are applied at the service boundary so bad input
//! is rejected with a reason instead of producing an empty plan.

use thiserror::Error;

use crate::geometry::has_self_intersection;
use crate::models::CampaignStatus;
use crate::types::GpsCoordinates;

/// Minimum number of vertices for a closed field boundary
pub const MIN_BOUNDARY_VERTICES: usize = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Boundary needs at least {MIN_BOUNDARY_VERTICES} vertices, got {0}")]
    TooFewVertices(usize),

    #[error("Vertex {index} has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinate {
        index: usize,
        latitude: f64,
        longitude: f64,
    },

    #[error("Boundary edges cross each other")]
    SelfIntersecting,

    #[error("Parcel name is required")]
    EmptyName,

    #[error("Crop is required")]
    EmptyCrop,

    #[error("Position is outside the field boundary")]
    OutsideBoundary,

    #[error("Position is within {buffer_meters} m of a boundary vertex")]
    InsideEdgeBuffer { buffer_meters: f64 },

    #[error("Campaign cannot move from {from} to {to}")]
    InvalidTransition {
        from: CampaignStatus,
        to: CampaignStatus,
    },

    #[error("Unknown campaign status: {0}")]
    UnknownStatus(String),
}

// ============================================================================
// Boundary Validations
// ============================================================================

/// Validate a drawn boundary: enough vertices, every coordinate in range,
/// and no crossing edges
pub fn validate_boundary(boundary: &[GpsCoordinates]) -> Result<(), DomainError> {
    if boundary.len() < MIN_BOUNDARY_VERTICES {
        return Err(DomainError::TooFewVertices(boundary.len()));
    }

    if let Some((index, c)) = boundary.iter().enumerate().find(|(_, c)| !c.is_valid()) {
        return Err(DomainError::InvalidCoordinate {
            index,
            latitude: c.latitude,
            longitude: c.longitude,
        });
    }

    if has_self_intersection(boundary) {
        return Err(DomainError::SelfIntersecting);
    }

    Ok(())
}

// ============================================================================
// Parcel Metadata Validations
// ============================================================================

pub fn validate_parcel_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::EmptyName);
    }
    Ok(())
}

pub fn validate_crop(crop: &str) -> Result<(), DomainError> {
    if crop.trim().is_empty() {
        return Err(DomainError::EmptyCrop);
    }
    Ok(())
}

/// All checks a new or edited parcel must pass
pub fn validate_parcel_input(
    name: &str,
    crop: &str,
    boundary: &[GpsCoordinates],
) -> Result<(), DomainError> {
    validate_parcel_name(name)?;
    validate_crop(crop)?;
    validate_boundary(boundary)
}
