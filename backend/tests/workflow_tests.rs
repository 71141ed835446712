//! Campaign workflow integration tests
//!
//! Plan, sample, analyze, and report against in-memory fakes of the store,
//! the geodata sources, and the vision model.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{aggregator, photos, square, test_config, Failures, FakeVision};
use shared::{CampaignStatus, FieldCampaign, GrowthStage};
use teralab_backend::error::AppError;
use teralab_backend::services::analysis::{AnalyzeCampaignInput, BatchAnalysisService, BatchPhase};
use teralab_backend::services::campaign::{CampaignService, ParcelInput};
use teralab_backend::services::{CampaignStore, InMemoryCampaignStore, ProgressRegistry};
use uuid::Uuid;

struct Harness {
    store: Arc<InMemoryCampaignStore>,
    campaigns: CampaignService,
    analysis: BatchAnalysisService,
    vision: Arc<FakeVision>,
    user: Uuid,
}

fn harness(vision: FakeVision, max_concurrency: usize) -> Harness {
    let store = Arc::new(InMemoryCampaignStore::new());
    let vision = Arc::new(vision);
    let config = test_config();
    Harness {
        campaigns: CampaignService::new(store.clone(), config.sampling.clone()),
        analysis: BatchAnalysisService::new(
            store.clone(),
            aggregator(Failures::default()),
            vision.clone(),
            ProgressRegistry::default(),
            max_concurrency,
        ),
        store,
        vision,
        user: Uuid::new_v4(),
    }
}

fn parcel_input() -> ParcelInput {
    ParcelInput {
        name: "Lote Sur".to_string(),
        crop: "maize".to_string(),
        stage: GrowthStage::Production,
        boundary: square(-34.6, -58.4, 200.0),
    }
}

/// Create a campaign and mark its first `n` points sampled
async fn sampled_campaign(h: &Harness, n: usize) -> FieldCampaign {
    let campaign = h
        .campaigns
        .create_campaign(h.user, parcel_input())
        .await
        .unwrap();
    assert!(campaign.points.len() >= n);

    let mut latest = campaign.clone();
    for point in campaign.points.iter().take(n) {
        latest = h
            .campaigns
            .mark_sampled(h.user, campaign.id, point.id)
            .await
            .unwrap();
    }
    latest
}

fn photos_for(campaign: &FieldCampaign, n: usize) -> AnalyzeCampaignInput {
    let images: HashMap<_, _> = campaign
        .points
        .iter()
        .filter(|p| p.is_sampled())
        .take(n)
        .map(|p| (p.id, photos()))
        .collect();
    AnalyzeCampaignInput {
        images,
        notes: "after rain".to_string(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_campaign_completes_with_report() {
        let h = harness(FakeVision::default(), 1);
        let campaign = sampled_campaign(&h, 3).await;
        assert_eq!(campaign.status, CampaignStatus::InProgress);

        let done = h
            .analysis
            .analyze_campaign(h.user, campaign.id, photos_for(&campaign, 3))
            .await
            .unwrap();

        assert_eq!(done.status, CampaignStatus::Completed);
        let report = done.global_analysis.as_ref().unwrap();
        assert_eq!(report.body["final_summary_text"], "3 points analyzed in Lote Sur");

        let linked = done
            .points
            .iter()
            .filter(|p| p.analysis_result_id.is_some())
            .count();
        assert_eq!(linked, 3);

        let analyses = h.store.point_analyses(campaign.id).await.unwrap();
        assert_eq!(analyses.len(), 3);
        for analysis in &analyses {
            assert!(analysis.geodata_used.soilgrids);
            assert_eq!(analysis.original_input.notes, "after rain");
            assert_eq!(analysis.original_input.crop, "maize");
            assert!(analysis.original_input.location.is_some());
        }

        let progress = h.analysis.progress(campaign.id).await.unwrap();
        assert_eq!(progress.phase, BatchPhase::Completed);
        assert_eq!((progress.completed, progress.total), (3, 3));
    }

    #[tokio::test]
    async fn test_points_are_analyzed_in_label_order() {
        let h = harness(FakeVision::default(), 1);
        let campaign = sampled_campaign(&h, 3).await;
        let done = h
            .analysis
            .analyze_campaign(h.user, campaign.id, photos_for(&campaign, 3))
            .await
            .unwrap();

        let analyses = h.store.point_analyses(campaign.id).await.unwrap();
        for (i, point) in done.points.iter().filter(|p| p.is_sampled()).enumerate() {
            let analysis = analyses
                .iter()
                .find(|a| Some(a.id) == point.analysis_result_id)
                .unwrap();
            assert_eq!(analysis.result["call"], i + 1);
        }
    }

    #[tokio::test]
    async fn test_failure_aborts_batch_and_keeps_persisted_results() {
        let h = harness(FakeVision::failing_on(2), 1);
        let campaign = sampled_campaign(&h, 3).await;

        let err = h
            .analysis
            .analyze_campaign(h.user, campaign.id, photos_for(&campaign, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VisionModel(_)));

        // the third point was never attempted
        assert_eq!(h.vision.call_count(), 2);

        let analyses = h.store.point_analyses(campaign.id).await.unwrap();
        assert_eq!(analyses.len(), 1);

        let stored = h.campaigns.get_campaign(h.user, campaign.id).await.unwrap();
        assert_eq!(stored.status, CampaignStatus::InProgress);
        assert!(stored.global_analysis.is_none());
        assert_eq!(stored.points[0].analysis_result_id, Some(analyses[0].id));

        let progress = h.analysis.progress(campaign.id).await.unwrap();
        assert_eq!(progress.phase, BatchPhase::Failed);
        assert_eq!(progress.completed, 1);
        assert!(progress.error.is_some());
    }

    #[tokio::test]
    async fn test_report_failure_keeps_point_analyses() {
        let h = harness(
            FakeVision {
                fail_report: true,
                ..FakeVision::default()
            },
            1,
        );
        let campaign = sampled_campaign(&h, 2).await;

        let err = h
            .analysis
            .analyze_campaign(h.user, campaign.id, photos_for(&campaign, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::VisionModel(_)));

        assert_eq!(h.store.point_analyses(campaign.id).await.unwrap().len(), 2);
        let stored = h.campaigns.get_campaign(h.user, campaign.id).await.unwrap();
        assert_eq!(stored.status, CampaignStatus::InProgress);
    }

    #[tokio::test]
    async fn test_sampled_points_without_photos_are_skipped() {
        let h = harness(FakeVision::default(), 1);
        let campaign = sampled_campaign(&h, 3).await;

        let done = h
            .analysis
            .analyze_campaign(h.user, campaign.id, photos_for(&campaign, 1))
            .await
            .unwrap();
        assert_eq!(h.vision.call_count(), 1);
        assert_eq!(done.status, CampaignStatus::Completed);
    }

    #[tokio::test]
    async fn test_no_photos_is_rejected_before_any_call() {
        let h = harness(FakeVision::default(), 1);
        let campaign = sampled_campaign(&h, 2).await;

        let err = h
            .analysis
            .analyze_campaign(h.user, campaign.id, AnalyzeCampaignInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(h.vision.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bounded_concurrency_completes_every_point() {
        let h = harness(FakeVision::default(), 2);
        let campaign = sampled_campaign(&h, 3).await;

        let done = h
            .analysis
            .analyze_campaign(h.user, campaign.id, photos_for(&campaign, 3))
            .await
            .unwrap();
        assert_eq!(done.status, CampaignStatus::Completed);
        assert_eq!(h.store.point_analyses(campaign.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_completed_campaign_cannot_go_back() {
        let h = harness(FakeVision::default(), 1);
        let campaign = sampled_campaign(&h, 2).await;
        h.analysis
            .analyze_campaign(h.user, campaign.id, photos_for(&campaign, 2))
            .await
            .unwrap();

        let pending = campaign
            .points
            .iter()
            .find(|p| !p.is_sampled())
            .map(|p| p.id)
            .unwrap();
        let err = h
            .campaigns
            .mark_sampled(h.user, campaign.id, pending)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        let stored = h.campaigns.get_campaign(h.user, campaign.id).await.unwrap();
        assert_eq!(stored.status, CampaignStatus::Completed);
    }

    #[tokio::test]
    async fn test_other_users_cannot_see_campaign() {
        let h = harness(FakeVision::default(), 1);
        let campaign = sampled_campaign(&h, 1).await;

        let err = h
            .analysis
            .analyze_campaign(Uuid::new_v4(), campaign.id, photos_for(&campaign, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_batches_for_one_campaign_conflict() {
        let h = harness(FakeVision::slow(300), 1);
        let campaign = sampled_campaign(&h, 1).await;

        let first = {
            let analysis = h.analysis.clone();
            let input = photos_for(&campaign, 1);
            let (user, id) = (h.user, campaign.id);
            tokio::spawn(async move { analysis.analyze_campaign(user, id, input).await })
        };
        let second = {
            let analysis = h.analysis.clone();
            let input = photos_for(&campaign, 1);
            let (user, id) = (h.user, campaign.id);
            tokio::spawn(async move { analysis.analyze_campaign(user, id, input).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let completed = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict { .. })))
            .count();
        assert_eq!(completed, 1);
        assert_eq!(conflicts, 1);

        assert_eq!(h.vision.call_count(), 1);
        assert_eq!(h.store.point_analyses(campaign.id).await.unwrap().len(), 1);
        let progress = h.analysis.progress(campaign.id).await.unwrap();
        assert_eq!(progress.phase, BatchPhase::Completed);
    }
}
