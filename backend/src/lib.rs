//! TeraLab backend
//!
//! Field sampling campaigns for precision agriculture: parcels are zoned,
//! sampling points are placed, and each sampled point is analyzed from its
//! photos plus soil, weather, terrain, and vegetation context.

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::Config;
use services::{CampaignStore, GeoDataAggregator, ProgressRegistry, VisionAnalyzer};

/// Request bodies carry base64 photo pairs for a whole campaign
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CampaignStore>,
    pub geodata: GeoDataAggregator,
    pub vision: Arc<dyn VisionAnalyzer>,
    pub progress: ProgressRegistry,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        geodata: GeoDataAggregator,
        vision: Arc<dyn VisionAnalyzer>,
        config: Config,
    ) -> Self {
        Self {
            store,
            geodata,
            vision,
            progress: ProgressRegistry::default(),
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "TeraLab Field Sampling API v1"
}
