//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the triage gateway's REST server on its own.
//!
//! ## Intended use
//! Useful for development and debugging; the workspace's main `triage-run`
//! binary is the production entry point and boots the same router.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_core::GatewayConfig;

/// Main entry point for the standalone REST API server
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: Server address (default: "0.0.0.0:8000")
/// - plus the gateway configuration variables read by
///   [`GatewayConfig::from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the gateway configuration is incomplete,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("triage_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("TRIAGE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());

    tracing::info!("-- Starting triage REST API on {}", addr);

    let config = GatewayConfig::from_env()?;
    let state = api_rest::build_state(config)?;
    let app = api_rest::app(state)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
