//! Geodata lookup handler

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::{GeoDataContext, GpsCoordinates};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

/// Query for a single coordinate
#[derive(Debug, Deserialize, Validate)]
pub struct GeoDataQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    #[serde(default)]
    #[validate(length(max = 60))]
    pub crop: String,
}

/// Geodata context for one coordinate
pub async fn get_geodata(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<GeoDataQuery>,
) -> AppResult<Json<GeoDataContext>> {
    query.validate()?;

    let context = state
        .geodata
        .fetch(GpsCoordinates::new(query.lat, query.lon), &query.crop)
        .await;

    Ok(Json(context))
}
