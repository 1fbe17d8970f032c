//! oauth-bridge - OAuth login flow and session management for axum
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - /auth/:provider, /auth/:provider/callback, /logout        │
//! │  - Optional session layer binding a session per request      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Auth Orchestrator                         │
//! │  - Provider resolution and registry                          │
//! │  - State token issue and validation                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Session Layer                             │
//! │  - Bound or store-fetched sessions                           │
//! │  - Any tower-sessions engine (in-memory default)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `auth`: Login lifecycle, providers, state tokens, HTTP endpoints
//! - `session`: Session manager, store, engine handle, session layer
//! - `context`: Per-request view handed to the auth and session layers
//! - `params`: Callback/query parameter map
//! - `config`: Configuration management
//! - `metrics`: Prometheus metrics
//! - `error`: Error types

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod params;
pub mod session;

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Login flow over the registered providers
    pub auth: Arc<auth::Authenticator>,
}

impl AppState {
    pub fn new(config: config::AppConfig, auth: auth::Authenticator) -> Self {
        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
        }
    }

    /// State whose authenticator is built from `config`
    ///
    /// Also installs the process-wide session manager for `config`.
    pub fn from_config(
        config: config::AppConfig,
        providers: Arc<auth::ProviderRegistry>,
    ) -> Self {
        let auth = auth::Authenticator::from_config(&config, providers);
        Self::new(config, auth)
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    let mut router = Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router());

    if state.config.session.bind_to_request {
        router = router.layer(state.auth.session_manager().store().layer());
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(metrics::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
