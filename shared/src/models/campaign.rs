//! Field campaign models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Parcel, SamplingPoint, Zone};
use crate::validation::DomainError;

/// One sampling and analysis cycle over a parcel.
///
/// The parcel, zones, and points are embedded snapshots: a later campaign for
/// the same parcel never mutates an earlier one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCampaign {
    pub id: Uuid,
    pub parcel_id: Uuid,
    pub parcel: Parcel,
    pub zones: Vec<Zone>,
    pub points: Vec<SamplingPoint>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_analysis: Option<FieldAnalysisReport>,
}

impl FieldCampaign {
    /// Start a new campaign in `planning` from a generated plan
    pub fn new(parcel: Parcel, zones: Vec<Zone>, points: Vec<SamplingPoint>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            parcel_id: parcel.id,
            parcel,
            zones,
            points,
            status: CampaignStatus::Planning,
            created_at: now,
            last_updated: now,
            global_analysis: None,
        }
    }

    /// Move to `next`, refusing any regression
    pub fn advance_to(&mut self, next: CampaignStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn point(&self, point_id: Uuid) -> Option<&SamplingPoint> {
        self.points.iter().find(|p| p.id == point_id)
    }

    pub fn point_mut(&mut self, point_id: Uuid) -> Option<&mut SamplingPoint> {
        self.points.iter_mut().find(|p| p.id == point_id)
    }

    pub fn zone_of(&self, point: &SamplingPoint) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == point.zone_id)
    }

    pub fn sampled_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_sampled()).count()
    }
}

/// Campaign lifecycle, strictly forward
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Planning,
    InProgress,
    Completed,
}

impl CampaignStatus {
    /// Staying put or moving forward is allowed; going back is not
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        next >= self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Planning => "planning",
            CampaignStatus::InProgress => "in_progress",
            CampaignStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(CampaignStatus::Planning),
            "in_progress" => Ok(CampaignStatus::InProgress),
            "completed" => Ok(CampaignStatus::Completed),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Field-level report produced by the aggregation pass.
///
/// The body (field summary, ranked problems, action plan, fertilization plan)
/// is authored by the external model and stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldAnalysisReport {
    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
    pub generated_at: DateTime<Utc>,
}
