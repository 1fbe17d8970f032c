//! Error types for oauth-bridge
//!
//! Every fallible operation in the crate returns `AppError`,
//! which implements `IntoResponse` so handlers can bubble it
//! straight back to the client with the right status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Crate-wide error type
///
/// Client-facing variants (4xx) cover bad input from the browser:
/// no provider, an unknown provider, a forged callback, or a
/// provider rejecting the exchange. Server-facing variants (5xx)
/// cover the session store and configuration.
#[derive(Debug, Error)]
pub enum AppError {
    /// No provider name could be resolved for the request (400)
    #[error("you must select a provider")]
    ProviderNotFound,

    /// Provider name resolved but nothing is registered under it (400)
    #[error("no provider for {0} exists")]
    UnknownProvider(String),

    /// Callback state does not match the stored state (400)
    ///
    /// Deliberately carries neither token.
    #[error("state token mismatch")]
    StateMismatch,

    /// Key absent from the session, or the session does not exist (404)
    #[error("could not find a matching session for this request")]
    SessionNotFound,

    /// Backing session store failed (500)
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    /// Identity provider rejected the code/token exchange (400)
    #[error("{0}")]
    ExchangeFailed(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the failure was caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::ProviderNotFound
                | AppError::UnknownProvider(_)
                | AppError::StateMismatch
                | AppError::SessionNotFound
                | AppError::ExchangeFailed(_)
        )
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::ProviderNotFound => "provider_not_found",
            AppError::UnknownProvider(_) => "unknown_provider",
            AppError::StateMismatch => "state_mismatch",
            AppError::SessionNotFound => "session_not_found",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::ExchangeFailed(_) => "exchange_failed",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Server-side failures get a generic message so store
    /// details never reach the browser.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message) = match &self {
            AppError::ProviderNotFound
            | AppError::UnknownProvider(_)
            | AppError::StateMismatch
            | AppError::ExchangeFailed(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::SessionNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::StoreUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session store unavailable".to_string(),
            ),
            AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if !self.is_client_error() {
            tracing::error!(error = %self, "Request failed");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.error_type()]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
