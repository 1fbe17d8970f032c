//! HTTP endpoints for the login flow

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};

use crate::AppState;
use crate::context::RequestContext;
use crate::error::AppError;

/// Create authentication router
///
/// Routes:
/// - GET /auth/:provider - Redirect to the provider
/// - GET /auth/:provider/callback - Provider callback
/// - GET /logout - Destroy the session
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/:provider", get(begin_auth))
        .route("/auth/:provider/callback", get(auth_callback))
        .route("/logout", get(logout))
}

/// GET /auth/:provider
///
/// Responds 307 to the provider's authorization URL.
async fn begin_auth(
    State(state): State<AppState>,
    mut ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let redirect = state.auth.begin_auth(&mut ctx).await?;
    Ok((ctx.into_cookie_jar(), redirect))
}

/// GET /auth/:provider/callback
///
/// Validates state, completes the exchange and returns the user's
/// profile as JSON.
async fn auth_callback(
    State(state): State<AppState>,
    mut ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.complete_user_auth(&mut ctx).await?;
    Ok((ctx.into_cookie_jar(), Json(user.profile())))
}

/// GET /logout
async fn logout(
    State(state): State<AppState>,
    mut ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(&mut ctx).await?;
    Ok((ctx.into_cookie_jar(), "logged out"))
}
