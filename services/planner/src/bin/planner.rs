//! services/planner/src/bin/planner.rs

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::{routing::get, Router};
use planner_lib::{
    adapters::{HttpTripServer, SqliteTripStore},
    config::Config,
    error::ApiError,
    web::{health_handler, state::AppState, ws_handler},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting planner...");

    // --- 2. Open Local Storage & Run Migrations ---
    info!("Opening trip store at {}...", config.database_url);
    let trip_store = SqliteTripStore::connect(&config.database_url).await?;
    info!("Running database migrations...");
    trip_store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Remote Trip Service Adapter ---
    let trip_server = HttpTripServer::new(config.trip_api_url.clone(), config.http_timeout)?;
    info!("Trip API at {}", config.trip_api_url);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        trips: Arc::new(trip_server),
        storage: Arc::new(trip_store),
        config: config.clone(),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // --- 5. Create the Web Router ---
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
