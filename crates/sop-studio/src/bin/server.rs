//! SOP Studio server binary
//!
//! Run with: cargo run -p sop-studio --bin sop-studio-server

use std::path::PathBuf;

use sop_studio::{config::AppConfig, server::SopServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sop_studio=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var_os("SOP_STUDIO_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.generation.backend);
    tracing::info!("  - Model: {}", config.generation.model);
    tracing::info!("  - Evict on fetch: {}", config.processing.evict_on_fetch);
    match config.processing.generation_timeout() {
        Some(limit) => tracing::info!("  - Call timeout: {:?}", limit),
        None => tracing::info!("  - Call timeout: none"),
    }

    let server = SopServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/jobs        - Start a job (JSON, base64 data)");
    println!("  POST /api/jobs/upload - Start a job (multipart)");
    println!("  GET  /api/jobs/:id    - Poll a job");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
