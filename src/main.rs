//! Demo server wiring the login flow to the stub provider

use std::sync::Arc;

use oauth_bridge::auth::{FauxProvider, ProviderRegistry};
use oauth_bridge::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Initialize metrics
/// 3. Load configuration from file and environment
/// 4. Register providers
/// 5. Build Axum router
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("OAUTH_BRIDGE__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "oauth_bridge=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "oauth_bridge=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting oauth-bridge demo...");

    // 2. Initialize metrics
    oauth_bridge::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        cookie = %config.session.cookie_name,
        bind_to_request = config.session.bind_to_request,
        "Configuration loaded"
    );

    // 4. Register providers
    let providers = Arc::new(ProviderRegistry::new());
    providers.register(FauxProvider::new());
    tracing::info!(providers = ?providers.names(), "Providers registered");

    // 5. Build Axum router
    let state = AppState::from_config(config.clone(), providers);
    let app = oauth_bridge::build_router(state);

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Try http://{}/auth/faux", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
