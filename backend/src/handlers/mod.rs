//! HTTP request handlers

pub mod analysis;
pub mod campaign;
pub mod geodata;
pub mod health;

pub use analysis::{analyze_campaign, get_progress, list_analyses};
pub use campaign::{
    create_campaign, get_campaign, list_campaigns, list_parcel_campaigns, list_parcels,
    mark_point_sampled, preview_plan, reanalyze_parcel, reposition_point,
};
pub use geodata::get_geodata;
pub use health::health_check;
