//! Route definitions for the TeraLab API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes
        .merge(protected_routes(state))
}

/// Every route that needs a bearer token
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/geodata", get(handlers::get_geodata))
        .route("/plans/preview", post(handlers::preview_plan))
        .nest("/campaigns", campaign_routes())
        .nest("/parcels", parcel_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Campaign routes
fn campaign_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_campaigns).post(handlers::create_campaign),
        )
        .route("/:campaign_id", get(handlers::get_campaign))
        .route(
            "/:campaign_id/points/:point_id/sample",
            post(handlers::mark_point_sampled),
        )
        .route(
            "/:campaign_id/points/:point_id/position",
            put(handlers::reposition_point),
        )
        .route("/:campaign_id/analyze", post(handlers::analyze_campaign))
        .route("/:campaign_id/progress", get(handlers::get_progress))
        .route("/:campaign_id/analyses", get(handlers::list_analyses))
}

/// Parcel routes
fn parcel_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_parcels))
        .route(
            "/:parcel_id/campaigns",
            get(handlers::list_parcel_campaigns).post(handlers::reanalyze_parcel),
        )
}
