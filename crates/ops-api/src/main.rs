//! Ops Control Plane API server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p ops-api
//! ```
//!
//! Configuration is loaded from environment variables or a `.env` file.

use ops_common::{try_init_tracing, AppConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {}", e);
    }

    if let Err(e) = run().await {
        error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Ops Control Plane API...");

    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        env = ?config.app.env,
        port = config.api.port,
        database = config.database.is_some(),
        storage = config.storage.is_some(),
        github = config.github.is_some(),
        direct_apply = config.ops.allow_direct_apply,
        "Configuration loaded"
    );

    ops_api::run(config).await?;

    Ok(())
}
