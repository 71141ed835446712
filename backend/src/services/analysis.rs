//! Batch analysis of a campaign's sampled points
//!
//! Each point with a photo pair gets its geodata context, is sent to the
//! vision model, and its result is persisted before the next one starts.
//! The first failure stops the batch; what was already stored stays stored.
//! When every point succeeds a field-level report completes the campaign.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use uuid::Uuid;

use shared::{
    AnalysisInput, CampaignStatus, FieldAnalysisReport, FieldCampaign, GeoDataContext,
    PointAnalysis, SampleImages, SamplingPoint,
};

use crate::error::{AppError, AppResult};
use crate::services::geodata::GeoDataAggregator;
use crate::services::store::CampaignStore;

/// The image-understanding collaborator
#[axum::async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Interpret one point's photos in light of its geodata
    async fn analyze_point(
        &self,
        images: &SampleImages,
        context: &GeoDataContext,
        input: &AnalysisInput,
    ) -> AppResult<serde_json::Value>;

    /// Aggregate all point results into a field report
    async fn field_report(
        &self,
        campaign: &FieldCampaign,
        analyses: &[PointAnalysis],
    ) -> AppResult<serde_json::Map<String, serde_json::Value>>;
}

/// Where a batch currently is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    AnalyzingPoints,
    GeneratingReport,
    Completed,
    Failed,
}

impl BatchPhase {
    pub fn is_running(self) -> bool {
        matches!(self, BatchPhase::AnalyzingPoints | BatchPhase::GeneratingReport)
    }
}

/// Progress of the latest batch of a campaign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub phase: BatchPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchProgress {
    fn at(completed: usize, total: usize, phase: BatchPhase) -> Self {
        Self {
            completed,
            total,
            phase,
            error: None,
        }
    }
}

/// In-memory progress per campaign, shared across requests
pub type ProgressRegistry = Arc<RwLock<HashMap<Uuid, BatchProgress>>>;

/// Photos and notes for a batch, keyed by sampling point
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeCampaignInput {
    #[serde(default)]
    pub images: HashMap<Uuid, SampleImages>,
    #[serde(default)]
    pub notes: String,
}

/// Batch analysis service
#[derive(Clone)]
pub struct BatchAnalysisService {
    store: Arc<dyn CampaignStore>,
    geodata: GeoDataAggregator,
    vision: Arc<dyn VisionAnalyzer>,
    progress: ProgressRegistry,
    max_concurrency: usize,
}

/// Strip an optional `data:...;base64,` prefix and check the payload decodes
fn check_image(point: &SamplingPoint, role: &str, encoded: &str) -> AppResult<()> {
    let payload = match encoded.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    let valid = !payload.is_empty() && STANDARD.decode(payload.trim()).is_ok();
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation {
            field: "images".to_string(),
            message: format!("{} image of point {} is not valid base64", role, point.label),
            message_es: format!("La imagen {} del punto {} no es base64 válido", role, point.label),
        })
    }
}

/// Sampled points that have photos, in plan order
fn batch_targets(
    campaign: &FieldCampaign,
    images: &mut HashMap<Uuid, SampleImages>,
) -> Vec<(SamplingPoint, SampleImages)> {
    campaign
        .points
        .iter()
        .filter(|p| p.is_sampled())
        .filter_map(|point| match images.remove(&point.id) {
            Some(pair) => Some((point.clone(), pair)),
            None => {
                tracing::warn!(point = %point.label, "Sampled point has no photos, skipping");
                None
            }
        })
        .collect()
}

async fn analyze_one(
    store: Arc<dyn CampaignStore>,
    geodata: GeoDataAggregator,
    vision: Arc<dyn VisionAnalyzer>,
    campaign_id: Uuid,
    point: SamplingPoint,
    images: SampleImages,
    input: AnalysisInput,
) -> AppResult<PointAnalysis> {
    let context = geodata.fetch(point.coordinates(), &input.crop).await;
    let result = vision.analyze_point(&images, &context, &input).await?;

    let analysis = PointAnalysis::new(campaign_id, point.id, result, context, input);
    store.save_point_analysis(&analysis).await?;
    Ok(analysis)
}

impl BatchAnalysisService {
    /// Create a new BatchAnalysisService instance
    pub fn new(
        store: Arc<dyn CampaignStore>,
        geodata: GeoDataAggregator,
        vision: Arc<dyn VisionAnalyzer>,
        progress: ProgressRegistry,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            geodata,
            vision,
            progress,
            max_concurrency: max_concurrency.max(1),
        }
    }

    async fn set_progress(&self, campaign_id: Uuid, progress: BatchProgress) {
        self.progress.write().await.insert(campaign_id, progress);
    }

    /// Mark a batch as running, unless one already is.
    ///
    /// Check and insert happen under one write guard so two requests cannot
    /// both start a batch for the same campaign.
    async fn claim_batch(&self, campaign_id: Uuid, total: usize) -> AppResult<()> {
        let mut registry = self.progress.write().await;
        if registry
            .get(&campaign_id)
            .is_some_and(|current| current.phase.is_running())
        {
            return Err(AppError::Conflict {
                resource: "analysis".to_string(),
                message: "An analysis is already running for this campaign".to_string(),
                message_es: "Ya hay un análisis en curso para esta campaña".to_string(),
            });
        }
        registry.insert(campaign_id, BatchProgress::at(0, total, BatchPhase::AnalyzingPoints));
        Ok(())
    }

    /// Progress of the latest batch for a campaign, if one ran since startup
    pub async fn progress(&self, campaign_id: Uuid) -> Option<BatchProgress> {
        self.progress.read().await.get(&campaign_id).cloned()
    }

    /// Analyses persisted for a campaign
    pub async fn analyses(&self, user_id: Uuid, campaign_id: Uuid) -> AppResult<Vec<PointAnalysis>> {
        self.load_campaign(user_id, campaign_id).await?;
        self.store.point_analyses(campaign_id).await
    }

    async fn load_campaign(&self, user_id: Uuid, campaign_id: Uuid) -> AppResult<FieldCampaign> {
        self.store
            .find_campaign(user_id, campaign_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Campaign".to_string()))
    }

    /// Analyze every sampled point that has photos, then build the field report
    pub async fn analyze_campaign(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        mut input: AnalyzeCampaignInput,
    ) -> AppResult<FieldCampaign> {
        let mut campaign = self.load_campaign(user_id, campaign_id).await?;

        let targets = batch_targets(&campaign, &mut input.images);
        if targets.is_empty() {
            return Err(AppError::Validation {
                field: "images".to_string(),
                message: "No sampled point has photos to analyze".to_string(),
                message_es: "Ningún punto muestreado tiene fotos para analizar".to_string(),
            });
        }
        for (point, images) in &targets {
            check_image(point, "surface", &images.surface_image)?;
            check_image(point, "profile", &images.profile_image)?;
        }

        let total = targets.len();
        self.claim_batch(campaign_id, total).await?;
        tracing::info!(campaign_id = %campaign_id, points = total, "Starting batch analysis");

        match self.run_batch(user_id, &mut campaign, targets, &input.notes).await {
            Ok(()) => {
                self.set_progress(campaign_id, BatchProgress::at(total, total, BatchPhase::Completed))
                    .await;
                tracing::info!(campaign_id = %campaign_id, points = total, "Batch analysis completed");
                Ok(campaign)
            }
            Err(e) => {
                let completed = self.progress(campaign_id).await.map_or(0, |p| p.completed);
                tracing::error!(
                    campaign_id = %campaign_id,
                    completed,
                    total,
                    error = %e,
                    "Batch analysis aborted"
                );
                self.set_progress(
                    campaign_id,
                    BatchProgress {
                        completed,
                        total,
                        phase: BatchPhase::Failed,
                        error: Some(e.to_string()),
                    },
                )
                .await;
                Err(e)
            }
        }
    }

    async fn run_batch(
        &self,
        user_id: Uuid,
        campaign: &mut FieldCampaign,
        targets: Vec<(SamplingPoint, SampleImages)>,
        notes: &str,
    ) -> AppResult<()> {
        let campaign_id = campaign.id;
        let total = targets.len();
        let mut done: Vec<PointAnalysis> = Vec::with_capacity(total);
        let mut started = 0;

        for chunk in targets.chunks(self.max_concurrency) {
            let mut tasks = JoinSet::new();
            for (point, images) in chunk {
                started += 1;
                tracing::info!(point = %point.label, "Analyzing point {} of {}", started, total);

                let input = AnalysisInput {
                    parcel_name: campaign.parcel.name.clone(),
                    crop: campaign.parcel.crop.clone(),
                    notes: notes.to_string(),
                    location: Some(point.coordinates()),
                };
                tasks.spawn(analyze_one(
                    self.store.clone(),
                    self.geodata.clone(),
                    self.vision.clone(),
                    campaign_id,
                    point.clone(),
                    images.clone(),
                    input,
                ));
            }

            let mut first_error = None;
            let mut finished = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(analysis)) => finished.push(analysis),
                    Ok(Err(e)) => {
                        first_error.get_or_insert(e);
                    }
                    Err(e) => {
                        first_error.get_or_insert(AppError::Internal(format!(
                            "Analysis task failed: {}",
                            e
                        )));
                    }
                }
            }

            for analysis in &finished {
                if let Some(point) = campaign.point_mut(analysis.sampling_point_id) {
                    point.analysis_result_id = Some(analysis.id);
                }
            }
            done.extend(finished);

            if !done.is_empty() {
                campaign.touch();
                self.store.save_campaign(user_id, campaign).await?;
            }
            self.set_progress(
                campaign_id,
                BatchProgress::at(done.len(), total, BatchPhase::AnalyzingPoints),
            )
            .await;

            if let Some(error) = first_error {
                return Err(error);
            }
        }

        self.set_progress(
            campaign_id,
            BatchProgress::at(total, total, BatchPhase::GeneratingReport),
        )
        .await;

        let body = self.vision.field_report(campaign, &done).await?;
        campaign.global_analysis = Some(FieldAnalysisReport {
            body,
            generated_at: Utc::now(),
        });
        campaign.advance_to(CampaignStatus::Completed)?;
        self.store.save_campaign(user_id, campaign).await?;
        Ok(())
    }
}
