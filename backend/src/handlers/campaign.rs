//! Campaign HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::Pagination;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::campaign::{CampaignService, ParcelInput, ReanalyzeInput, RepositionInput};
use crate::AppState;

fn service(state: &AppState) -> CampaignService {
    CampaignService::new(state.store.clone(), state.config.sampling.clone())
}

/// Page selection for campaign listings
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListQuery {
    fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page).max(1),
            per_page: self.per_page.unwrap_or(defaults.per_page).clamp(1, 100),
        }
    }
}

/// Preview the zones and points for a drawn parcel
pub async fn preview_plan(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<ParcelInput>,
) -> impl IntoResponse {
    match service(&state).preview_plan(input) {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a parcel with its first campaign
pub async fn create_campaign(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ParcelInput>,
) -> impl IntoResponse {
    match service(&state).create_campaign(user.user_id, input).await {
        Ok(campaign) => (StatusCode::CREATED, Json(campaign)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List campaigns, newest first
pub async fn list_campaigns(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    match service(&state)
        .list_campaigns(user.user_id, query.pagination())
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a campaign
pub async fn get_campaign(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(campaign_id): Path<Uuid>,
) -> impl IntoResponse {
    match service(&state).get_campaign(user.user_id, campaign_id).await {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Mark a point as sampled
pub async fn mark_point_sampled(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((campaign_id, point_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match service(&state)
        .mark_sampled(user.user_id, campaign_id, point_id)
        .await
    {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Move a point after a manual drag
pub async fn reposition_point(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((campaign_id, point_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<RepositionInput>,
) -> impl IntoResponse {
    match service(&state)
        .reposition_point(user.user_id, campaign_id, point_id, input)
        .await
    {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Parcels with their latest campaign state
pub async fn list_parcels(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let parcels = service(&state).parcel_summaries(user.user_id).await?;
    Ok(Json(serde_json::json!({ "parcels": parcels })))
}

/// Campaign history of one parcel
pub async fn list_parcel_campaigns(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(parcel_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let campaigns = service(&state)
        .parcel_campaigns(user.user_id, parcel_id)
        .await?;
    Ok(Json(serde_json::json!({ "campaigns": campaigns })))
}

/// Start a new campaign on an existing parcel
pub async fn reanalyze_parcel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(parcel_id): Path<Uuid>,
    Json(input): Json<ReanalyzeInput>,
) -> impl IntoResponse {
    match service(&state)
        .reanalyze(user.user_id, parcel_id, input)
        .await
    {
        Ok(campaign) => (StatusCode::CREATED, Json(campaign)).into_response(),
        Err(e) => e.into_response(),
    }
}
