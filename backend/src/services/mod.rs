//! Business logic services for the TeraLab backend

pub mod analysis;
pub mod campaign;
pub mod geodata;
pub mod store;

pub use analysis::{BatchAnalysisService, BatchProgress, ProgressRegistry, VisionAnalyzer};
pub use campaign::CampaignService;
pub use geodata::GeoDataAggregator;
pub use store::{CampaignStore, InMemoryCampaignStore, PgCampaignStore};
