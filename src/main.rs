/// Main application entry point
use rust_aurora::clients::{NoaaClient, NwsClient};
use rust_aurora::config::AppConfig;
use rust_aurora::handlers::AppState;
use rust_aurora::locations::load_locations;
use rust_aurora::routes::build_router;
use rust_aurora::services::AuroraService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // A bad registry is a deployment error, refuse to start
    let locations = load_locations(config.locations_file.as_deref())?;
    info!(count = locations.len(), "Locations loaded");

    // Initialize clients
    let noaa_client = NoaaClient::new(&config.upstream)?;
    let nws_client = NwsClient::new(&config.upstream)?;

    // Initialize service
    let service = Arc::new(AuroraService::new(noaa_client, nws_client));

    // Initialize application state
    let state = AppState {
        service,
        locations: Arc::new(locations),
    };

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("rust_aurora service listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
