//! Campaign workflow service
//!
//! Plan preview, campaign creation, re-analysis of an existing parcel, and the
//! field workflow on individual points (mark sampled, drag).

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shared::sampling::check_sampling_position;
use shared::zoning::FixedArchetypeStrategy;
use shared::{
    build_sampling_plan, validate_parcel_input, CampaignStatus, DomainError, FieldCampaign,
    GpsCoordinates, GrowthStage, PaginatedResponse, Pagination, PaginationMeta, Parcel,
    ParcelSummary, PointStatus, PositionState, SamplingPlan,
};

use crate::config::SamplingSettings;
use crate::error::{AppError, AppResult};
use crate::services::store::CampaignStore;

/// Campaign service
#[derive(Clone)]
pub struct CampaignService {
    store: Arc<dyn CampaignStore>,
    sampling: SamplingSettings,
}

/// A freshly drawn parcel
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ParcelInput {
    #[validate(length(max = 120))]
    pub name: String,
    #[validate(length(max = 60))]
    pub crop: String,
    #[serde(default)]
    pub stage: GrowthStage,
    pub boundary: Vec<GpsCoordinates>,
}

/// Edits applied when starting a new campaign on an existing parcel.
///
/// Omitted fields keep the values of the parcel's latest campaign.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReanalyzeInput {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 60))]
    pub crop: Option<String>,
    pub stage: Option<GrowthStage>,
    pub boundary: Option<Vec<GpsCoordinates>>,
}

/// New position for a dragged point
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RepositionInput {
    pub lat: f64,
    pub lon: f64,
}

impl CampaignService {
    /// Create a new CampaignService instance
    pub fn new(store: Arc<dyn CampaignStore>, sampling: SamplingSettings) -> Self {
        Self { store, sampling }
    }

    fn plan_for(&self, parcel: Parcel) -> SamplingPlan {
        build_sampling_plan(
            parcel,
            &FixedArchetypeStrategy,
            &self.sampling.generator_config(),
        )
    }

    /// Validate a drawn parcel and generate its plan without persisting anything
    pub fn preview_plan(&self, input: ParcelInput) -> AppResult<SamplingPlan> {
        input.validate()?;
        validate_parcel_input(&input.name, &input.crop, &input.boundary)?;

        let parcel = Parcel::new(
            input.name.trim(),
            input.crop.trim(),
            input.stage,
            input.boundary,
        );
        Ok(self.plan_for(parcel))
    }

    /// Create a parcel and its first campaign in `planning`
    pub async fn create_campaign(&self, user_id: Uuid, input: ParcelInput) -> AppResult<FieldCampaign> {
        let plan = self.preview_plan(input)?;
        let campaign = FieldCampaign::new(plan.parcel, plan.zones, plan.points);

        self.store.save_campaign(user_id, &campaign).await?;

        tracing::info!(
            campaign_id = %campaign.id,
            parcel_id = %campaign.parcel_id,
            zones = campaign.zones.len(),
            points = campaign.points.len(),
            "Campaign created"
        );
        Ok(campaign)
    }

    /// Start a new campaign for an existing parcel, optionally with edits.
    ///
    /// Zones and points are regenerated from scratch. Earlier campaigns keep
    /// their own snapshots.
    pub async fn reanalyze(
        &self,
        user_id: Uuid,
        parcel_id: Uuid,
        input: ReanalyzeInput,
    ) -> AppResult<FieldCampaign> {
        input.validate()?;

        let history = self.store.campaigns_for_parcel(user_id, parcel_id).await?;
        let latest = history
            .first()
            .ok_or_else(|| AppError::NotFound("Parcel".to_string()))?;

        if history.iter().any(|c| c.status == CampaignStatus::InProgress) {
            return Err(AppError::Conflict {
                resource: "campaign".to_string(),
                message: "Parcel has a campaign in progress".to_string(),
                message_es: "El lote tiene una campaña en curso".to_string(),
            });
        }

        let previous = &latest.parcel;
        let name = input.name.unwrap_or_else(|| previous.name.clone());
        let crop = input.crop.unwrap_or_else(|| previous.crop.clone());
        let stage = input.stage.unwrap_or(previous.stage);
        let boundary = input.boundary.unwrap_or_else(|| previous.boundary.clone());

        validate_parcel_input(&name, &crop, &boundary)?;

        let parcel = Parcel::with_id(parcel_id, name.trim(), crop.trim(), stage, boundary);
        let plan = self.plan_for(parcel);
        let campaign = FieldCampaign::new(plan.parcel, plan.zones, plan.points);

        self.store.save_campaign(user_id, &campaign).await?;

        tracing::info!(
            campaign_id = %campaign.id,
            parcel_id = %parcel_id,
            previous_campaigns = history.len(),
            "Re-analysis campaign created"
        );
        Ok(campaign)
    }

    /// Get a campaign by ID
    pub async fn get_campaign(&self, user_id: Uuid, campaign_id: Uuid) -> AppResult<FieldCampaign> {
        self.store
            .find_campaign(user_id, campaign_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Campaign".to_string()))
    }

    /// List campaigns, newest first
    pub async fn list_campaigns(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<FieldCampaign>> {
        let (data, total) = self.store.list_campaigns(user_id, &pagination).await?;
        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(&pagination, total),
        })
    }

    /// Campaigns of one parcel, newest first
    pub async fn parcel_campaigns(&self, user_id: Uuid, parcel_id: Uuid) -> AppResult<Vec<FieldCampaign>> {
        self.store.campaigns_for_parcel(user_id, parcel_id).await
    }

    /// One row per parcel, described by its latest campaign
    pub async fn parcel_summaries(&self, user_id: Uuid) -> AppResult<Vec<ParcelSummary>> {
        let campaigns = self.store.all_campaigns(user_id).await?;

        let mut seen = HashSet::new();
        let summaries = campaigns
            .iter()
            .filter(|c| seen.insert(c.parcel_id))
            .map(|c| ParcelSummary {
                id: c.parcel_id,
                name: c.parcel.name.clone(),
                crop: c.parcel.crop.clone(),
                area_hectares: c.parcel.area_hectares,
                latest_campaign_id: Some(c.id),
                latest_campaign_status: Some(c.status),
                sampled_points_count: c.sampled_count(),
                total_points_count: c.points.len(),
            })
            .collect();

        Ok(summaries)
    }

    /// Record that a point has been physically sampled
    pub async fn mark_sampled(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        point_id: Uuid,
    ) -> AppResult<FieldCampaign> {
        let mut campaign = self.get_campaign(user_id, campaign_id).await?;
        ensure_editable(&campaign)?;

        let point = campaign
            .point_mut(point_id)
            .ok_or_else(|| AppError::NotFound("Sampling point".to_string()))?;
        point.status = PointStatus::Sampled;

        if campaign.status == CampaignStatus::Planning {
            campaign.advance_to(CampaignStatus::InProgress)?;
        } else {
            campaign.touch();
        }

        self.store.save_campaign(user_id, &campaign).await?;
        Ok(campaign)
    }

    /// Move a point after a manual drag.
    ///
    /// With `validate_adjusted_points` the new position must satisfy the same
    /// rule as generated points. Otherwise any valid coordinate is accepted
    /// and the point is flagged as unvalidated.
    pub async fn reposition_point(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        point_id: Uuid,
        input: RepositionInput,
    ) -> AppResult<FieldCampaign> {
        let to = GpsCoordinates::new(input.lat, input.lon);
        if !to.is_valid() {
            return Err(DomainError::InvalidCoordinate {
                index: 0,
                latitude: input.lat,
                longitude: input.lon,
            }
            .into());
        }

        let mut campaign = self.get_campaign(user_id, campaign_id).await?;
        ensure_editable(&campaign)?;

        let position = if self.sampling.validate_adjusted_points {
            check_sampling_position(
                &to,
                &campaign.parcel.boundary,
                self.sampling.edge_buffer_meters,
            )?;
            PositionState::Adjusted
        } else {
            PositionState::Unvalidated
        };

        let point = campaign
            .point_mut(point_id)
            .ok_or_else(|| AppError::NotFound("Sampling point".to_string()))?;
        point.lat = to.latitude;
        point.lon = to.longitude;
        point.position = position;
        campaign.touch();

        self.store.save_campaign(user_id, &campaign).await?;
        Ok(campaign)
    }
}

fn ensure_editable(campaign: &FieldCampaign) -> AppResult<()> {
    if campaign.status == CampaignStatus::Completed {
        return Err(AppError::InvalidStateTransition(format!(
            "Campaign {} is completed",
            campaign.id
        )));
    }
    Ok(())
}
