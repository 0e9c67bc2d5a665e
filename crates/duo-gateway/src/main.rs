//! Gateway entry point.
//!
//! All configuration comes from environment variables (a `.env` file is
//! honored when present); see `AppConfig` for the full list.

use duo_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let tracing_config = if production_env() {
        TracingConfig::production()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = try_init_tracing_with_config(&tracing_config) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Gateway failed to start");
        std::process::exit(1);
    }
}

/// Peek at `APP_ENV` before the full config is parsed, so tracing can be
/// set up first and config errors get logged.
fn production_env() -> bool {
    std::env::var("APP_ENV").is_ok_and(|v| v.eq_ignore_ascii_case("production"))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        app = %config.app.name,
        env = ?config.app.env,
        port = config.gateway.port,
        "Configuration loaded"
    );

    duo_gateway::run(config).await?;
    Ok(())
}
