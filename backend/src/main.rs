//! TeraLab backend server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teralab_backend::{
    create_app,
    external::VisionClient,
    services::{GeoDataAggregator, PgCampaignStore},
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "teralab_server=debug,teralab_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting TeraLab server");
    tracing::info!("Environment: {}", config.environment);

    if config.agromonitoring.api_key.is_none() {
        tracing::warn!("AgroMonitoring API key not set, NDVI will report no data");
    }

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let vision = VisionClient::new(
        config.vision.endpoint.clone(),
        config.vision.api_key.clone(),
        config.vision.model.clone(),
        config.vision.timeout_secs,
    );

    // Create application state
    let state = AppState::new(
        Arc::new(PgCampaignStore::new(db_pool)),
        GeoDataAggregator::from_config(&config),
        Arc::new(vision),
        config.clone(),
    );

    // Build application
    let app = create_app(state);

    // Start server
    let ip: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((ip, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
