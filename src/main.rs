use std::sync::Arc;

use biofactor::{
    core::{auth::DenyAllCredentials, enrollment::device::DisconnectedScanner},
    utils::config::Config,
    Application,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::new().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.node.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();

    info!("Starting biofactor v{}", env!("CARGO_PKG_VERSION"));
    warn!("no credential backend configured, all password checks will be rejected");

    // Initialize application with the placeholder collaborators; deployments
    // swap in a real credential store and scanner driver here.
    let app = Application::new(
        config,
        Arc::new(DenyAllCredentials),
        Arc::new(DisconnectedScanner::new()),
    )
    .map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    app.run().await.map_err(|e| {
        error!("Server error: {}", e);
        e
    })?;

    info!("Application shutdown complete");
    Ok(())
}
