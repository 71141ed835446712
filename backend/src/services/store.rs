//! Campaign persistence
//!
//! Campaigns and point analyses are stored as whole JSON documents, the way
//! the managed store keeps them. Writes are last-write-wins.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::{types::Json, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared::{FieldCampaign, Pagination, PointAnalysis};

use crate::error::AppResult;

/// Storage for campaigns and their point analyses, scoped per user
#[axum::async_trait]
pub trait CampaignStore: Send + Sync {
    /// Insert or replace a campaign document
    async fn save_campaign(&self, user_id: Uuid, campaign: &FieldCampaign) -> AppResult<()>;

    /// Find a campaign owned by `user_id`
    async fn find_campaign(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<FieldCampaign>>;

    /// One page of campaigns, newest first, with the total count
    async fn list_campaigns(
        &self,
        user_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<FieldCampaign>, u64)>;

    /// Every campaign of a parcel, newest first
    async fn campaigns_for_parcel(
        &self,
        user_id: Uuid,
        parcel_id: Uuid,
    ) -> AppResult<Vec<FieldCampaign>>;

    /// Every campaign of the user, newest first
    async fn all_campaigns(&self, user_id: Uuid) -> AppResult<Vec<FieldCampaign>>;

    async fn save_point_analysis(&self, analysis: &PointAnalysis) -> AppResult<()>;

    async fn point_analyses(&self, campaign_id: Uuid) -> AppResult<Vec<PointAnalysis>>;

    /// Connectivity check for health reporting
    async fn ping(&self) -> AppResult<()>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// PostgreSQL-backed store with JSONB documents
#[derive(Clone)]
pub struct PgCampaignStore {
    db: PgPool,
}

impl PgCampaignStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[axum::async_trait]
impl CampaignStore for PgCampaignStore {
    async fn save_campaign(&self, user_id: Uuid, campaign: &FieldCampaign) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO campaigns (id, user_id, parcel_id, status, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
               SET status = EXCLUDED.status,
                   data = EXCLUDED.data,
                   updated_at = EXCLUDED.updated_at
             WHERE campaigns.user_id = EXCLUDED.user_id
            "#,
        )
        .bind(campaign.id)
        .bind(user_id)
        .bind(campaign.parcel_id)
        .bind(campaign.status.as_str())
        .bind(Json(campaign))
        .bind(campaign.created_at)
        .bind(campaign.last_updated)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn find_campaign(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<FieldCampaign>> {
        let row = sqlx::query_scalar::<_, Json<FieldCampaign>>(
            "SELECT data FROM campaigns WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|Json(c)| c))
    }

    async fn list_campaigns(
        &self,
        user_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<FieldCampaign>, u64)> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM campaigns WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_scalar::<_, Json<FieldCampaign>>(
            r#"
            SELECT data FROM campaigns
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(i64::from(pagination.per_page))
        .bind(pagination.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        Ok((rows.into_iter().map(|Json(c)| c).collect(), total.max(0) as u64))
    }

    async fn campaigns_for_parcel(
        &self,
        user_id: Uuid,
        parcel_id: Uuid,
    ) -> AppResult<Vec<FieldCampaign>> {
        let rows = sqlx::query_scalar::<_, Json<FieldCampaign>>(
            r#"
            SELECT data FROM campaigns
            WHERE user_id = $1 AND parcel_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(parcel_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|Json(c)| c).collect())
    }

    async fn all_campaigns(&self, user_id: Uuid) -> AppResult<Vec<FieldCampaign>> {
        let rows = sqlx::query_scalar::<_, Json<FieldCampaign>>(
            "SELECT data FROM campaigns WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|Json(c)| c).collect())
    }

    async fn save_point_analysis(&self, analysis: &PointAnalysis) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO point_analyses (id, campaign_id, sampling_point_id, data, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(analysis.id)
        .bind(analysis.campaign_id)
        .bind(analysis.sampling_point_id)
        .bind(Json(analysis))
        .bind(analysis.timestamp)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn point_analyses(&self, campaign_id: Uuid) -> AppResult<Vec<PointAnalysis>> {
        let rows = sqlx::query_scalar::<_, Json<PointAnalysis>>(
            "SELECT data FROM point_analyses WHERE campaign_id = $1 ORDER BY created_at ASC",
        )
        .bind(campaign_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|Json(a)| a).collect())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store for tests and offline development
#[derive(Clone, Default)]
pub struct InMemoryCampaignStore {
    campaigns: Arc<RwLock<HashMap<Uuid, (Uuid, FieldCampaign)>>>,
    analyses: Arc<RwLock<Vec<PointAnalysis>>>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn owned_by(&self, user_id: Uuid) -> Vec<FieldCampaign> {
        let mut campaigns: Vec<FieldCampaign> = self
            .campaigns
            .read()
            .await
            .values()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, c)| c.clone())
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }
}

#[axum::async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn save_campaign(&self, user_id: Uuid, campaign: &FieldCampaign) -> AppResult<()> {
        let mut campaigns = self.campaigns.write().await;
        if let Some((owner, _)) = campaigns.get(&campaign.id) {
            if *owner != user_id {
                return Ok(());
            }
        }
        campaigns.insert(campaign.id, (user_id, campaign.clone()));
        Ok(())
    }

    async fn find_campaign(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<FieldCampaign>> {
        Ok(self
            .campaigns
            .read()
            .await
            .get(&id)
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, c)| c.clone()))
    }

    async fn list_campaigns(
        &self,
        user_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<FieldCampaign>, u64)> {
        let all = self.owned_by(user_id).await;
        let total = all.len() as u64;
        let page = all
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn campaigns_for_parcel(
        &self,
        user_id: Uuid,
        parcel_id: Uuid,
    ) -> AppResult<Vec<FieldCampaign>> {
        Ok(self
            .owned_by(user_id)
            .await
            .into_iter()
            .filter(|c| c.parcel_id == parcel_id)
            .collect())
    }

    async fn all_campaigns(&self, user_id: Uuid) -> AppResult<Vec<FieldCampaign>> {
        Ok(self.owned_by(user_id).await)
    }

    async fn save_point_analysis(&self, analysis: &PointAnalysis) -> AppResult<()> {
        let mut analyses = self.analyses.write().await;
        analyses.retain(|a| a.id != analysis.id);
        analyses.push(analysis.clone());
        Ok(())
    }

    async fn point_analyses(&self, campaign_id: Uuid) -> AppResult<Vec<PointAnalysis>> {
        Ok(self
            .analyses
            .read()
            .await
            .iter()
            .filter(|a| a.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
