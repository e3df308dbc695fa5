use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_core::GatewayConfig;

/// Main entry point for the triage gateway
///
/// Resolves configuration from the environment once, wires up the SMART
/// auth client, FHIR client and scoring services, and serves the REST API.
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `FHIR_SERVER_URL`, `BASE_URL`, `CLIENT_ID`, `AUTH_SERVER_URL`,
///   `TOKEN_SERVER_URL`: required gateway settings
/// - `OPENAI_API_KEY`, `LLM_API_URL`, `LLM_MODEL`, `TRIAGE_STRATEGY`,
///   `FRONTEND_URL`, `DEBUG`: optional gateway settings
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("triage_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("TRIAGE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());

    tracing::info!("++ Starting triage gateway REST API on {}", addr);

    let config = GatewayConfig::from_env()?;
    if config.debug() {
        tracing::info!("debug mode enabled");
    }

    let state = api_rest::build_state(config)?;
    let app = api_rest::app(state)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
