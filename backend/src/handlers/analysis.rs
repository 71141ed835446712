//! Batch analysis HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::analysis::{AnalyzeCampaignInput, BatchAnalysisService};
use crate::AppState;

fn service(state: &AppState) -> BatchAnalysisService {
    BatchAnalysisService::new(
        state.store.clone(),
        state.geodata.clone(),
        state.vision.clone(),
        state.progress.clone(),
        state.config.analysis.max_concurrency,
    )
}

/// Run the batch analysis of a campaign
pub async fn analyze_campaign(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(campaign_id): Path<Uuid>,
    Json(input): Json<AnalyzeCampaignInput>,
) -> impl IntoResponse {
    match service(&state)
        .analyze_campaign(user.user_id, campaign_id, input)
        .await
    {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Progress of the latest batch of a campaign
pub async fn get_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(campaign_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    if state
        .store
        .find_campaign(user.user_id, campaign_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Campaign".to_string()));
    }

    let progress = service(&state)
        .progress(campaign_id)
        .await
        .ok_or_else(|| AppError::NotFound("Analysis batch".to_string()))?;
    Ok(Json(progress))
}

/// Point analyses stored for a campaign
pub async fn list_analyses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(campaign_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let analyses = service(&state).analyses(user.user_id, campaign_id).await?;
    Ok(Json(serde_json::json!({ "analyses": analyses })))
}
