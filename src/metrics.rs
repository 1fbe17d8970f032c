//! Prometheus metrics registry, instruments and `/metrics` endpoint.

use std::sync::Once;

use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Login lifecycle steps by outcome
    pub static ref AUTH_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_bridge_auth_requests_total", "Total number of login lifecycle steps"),
        &["step", "outcome"]
    ).expect("metric can be created");

    /// Session manager calls, split by bound vs store-fetched sessions
    pub static ref SESSION_OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_bridge_session_operations_total", "Total number of session manager operations"),
        &["operation", "mode"]
    ).expect("metric can be created");

    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_bridge_errors_total", "Total number of errors returned to clients"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Register all instruments with [`REGISTRY`].
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        let collectors: [Box<dyn prometheus::core::Collector>; 3] = [
            Box::new(AUTH_REQUESTS_TOTAL.clone()),
            Box::new(SESSION_OPERATIONS_TOTAL.clone()),
            Box::new(ERRORS_TOTAL.clone()),
        ];
        for collector in collectors {
            if let Err(error) = REGISTRY.register(collector) {
                tracing::warn!(%error, "Failed to register metric");
            }
        }
        tracing::info!("Metrics registry initialized");
    });
}

async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(%error, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// Create metrics router
///
/// Exposes the `/metrics` endpoint.
pub fn metrics_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/metrics", get(metrics_handler))
}
