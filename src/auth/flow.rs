//! Login lifecycle: begin, complete, logout
//!
//! # Flow
//! 1. `begin_auth` resolves the provider, mints a state token, stores a
//!    pending [`AuthSession`] under a provider-qualified key and
//!    redirects the browser to the provider.
//! 2. The provider redirects back with `code` and `state`.
//! 3. `complete_user_auth` checks `state` against the pending entry,
//!    consumes it, and asks the provider for the user.
//! 4. `logout` destroys the whole session.

use std::sync::Arc;

use axum::response::Redirect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::{ProviderRegistry, User};
use super::{resolver, state};
use crate::config::AppConfig;
use crate::context::RequestContext;
use crate::error::{AppError, Result};
use crate::metrics::AUTH_REQUESTS_TOTAL;
use crate::session::{self, MemoryStore, SessionManager, SessionStore};

/// Options for [`Authenticator::complete_user_auth_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompleteAuthOptions {
    /// Destroy the whole session once the callback state has validated
    pub logout: bool,
}

/// Pending login kept in the session between begin and callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub provider: String,
    /// `None` once the callback has consumed it
    pub state: Option<String>,
    pub auth_url: String,
    pub created_at: DateTime<Utc>,
}

/// Session key holding the pending login for `provider`
pub fn session_key(provider: &str) -> String {
    format!("auth_session:{provider}")
}

/// Drives the login lifecycle against a provider registry
///
/// Session access goes through the process-wide [`session::manager`],
/// read on every call, unless a manager was pinned with
/// [`with_session_manager`](Self::with_session_manager).
#[derive(Debug, Clone)]
pub struct Authenticator {
    providers: Arc<ProviderRegistry>,
    sessions: Option<SessionManager>,
    options: CompleteAuthOptions,
}

impl Authenticator {
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self {
            providers,
            sessions: None,
            options: CompleteAuthOptions::default(),
        }
    }

    /// Authenticator with the login settings of `config`
    ///
    /// Installs a process-wide manager over an in-memory store with the
    /// session settings of `config`. A later [`session::use_manager`]
    /// replaces it for every request served afterwards.
    pub fn from_config(config: &AppConfig, providers: Arc<ProviderRegistry>) -> Self {
        let store = SessionStore::new(MemoryStore::default(), config.session.clone());
        session::use_manager(SessionManager::new(store));

        Self::new(providers).with_options(CompleteAuthOptions {
            logout: config.auth.logout_on_complete,
        })
    }

    /// Pin `sessions` instead of following the process-wide manager
    pub fn with_session_manager(mut self, sessions: SessionManager) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Default options for [`complete_user_auth`](Self::complete_user_auth)
    pub fn with_options(mut self, options: CompleteAuthOptions) -> Self {
        self.options = options;
        self
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn session_manager(&self) -> SessionManager {
        self.sessions.clone().unwrap_or_else(session::manager)
    }

    /// Authorization URL for the request's provider
    ///
    /// Records the pending login (including the state) in the session.
    ///
    /// # Errors
    /// - `ProviderNotFound` / `UnknownProvider` if the provider cannot be resolved
    /// - `Internal` if the provider cannot build the URL
    /// - session errors from persisting the pending login
    pub async fn auth_url(&self, ctx: &mut RequestContext) -> Result<String> {
        let (_, auth_url) = self.start(ctx).await?;
        Ok(auth_url)
    }

    /// Start a login: redirect (307) to the provider's authorization URL
    pub async fn begin_auth(&self, ctx: &mut RequestContext) -> Result<Redirect> {
        match self.start(ctx).await {
            Ok((provider, url)) => {
                record("begin", "redirect");
                tracing::info!(%provider, "Login started");
                Ok(Redirect::temporary(&url))
            }
            Err(e) => {
                record("begin", "error");
                tracing::warn!(error = %e, "Login could not be started");
                Err(e)
            }
        }
    }

    /// Resolve the provider and record the pending login
    ///
    /// Returns the provider name and its authorization URL.
    async fn start(&self, ctx: &mut RequestContext) -> Result<(String, String)> {
        let provider_name = resolver::resolve(ctx)?;
        let provider = self.providers.get(&provider_name)?;

        let state = state::set_state(ctx);
        let auth_url = provider.authorization_url(&state).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "provider {provider_name} could not build an authorization URL: {e}"
            ))
        })?;

        let pending = AuthSession {
            provider: provider_name.clone(),
            state: Some(state),
            auth_url: auth_url.clone(),
            created_at: Utc::now(),
        };
        self.session_manager()
            .set_value(ctx, &session_key(&provider_name), &serde_json::to_string(&pending)?)
            .await?;

        Ok((provider_name, auth_url))
    }

    /// Finish a login with the authenticator's default options
    pub async fn complete_user_auth(&self, ctx: &mut RequestContext) -> Result<User> {
        self.complete_user_auth_with(ctx, self.options).await
    }

    /// Finish a login from the provider's callback
    ///
    /// The callback's `state` must equal the one stored when the login
    /// began. It is consumed on success, so replaying the same callback
    /// fails.
    ///
    /// # Errors
    /// - `ProviderNotFound` / `UnknownProvider`
    /// - `StateMismatch` if the state is missing, wrong, or already used
    /// - `ExchangeFailed` with the provider's message
    pub async fn complete_user_auth_with(
        &self,
        ctx: &mut RequestContext,
        options: CompleteAuthOptions,
    ) -> Result<User> {
        let result = self.complete(ctx, options).await;
        match &result {
            Ok(user) => {
                record("complete", "success");
                tracing::info!(provider = %user.provider, user_id = %user.user_id, "Login completed");
            }
            Err(AppError::StateMismatch) => {
                record("complete", "state_mismatch");
                tracing::warn!("Callback rejected: state token mismatch");
            }
            Err(e) => {
                record("complete", "error");
                tracing::warn!(error = %e, "Login could not be completed");
            }
        }
        result
    }

    async fn complete(
        &self,
        ctx: &mut RequestContext,
        options: CompleteAuthOptions,
    ) -> Result<User> {
        let provider_name = resolver::resolve(ctx)?;
        let provider = self.providers.get(&provider_name)?;
        let sessions = self.session_manager();
        let key = session_key(&provider_name);

        let pending = match sessions.get_value(ctx, &key).await {
            Ok(raw) => serde_json::from_str::<AuthSession>(&raw).ok(),
            Err(AppError::SessionNotFound) => None,
            Err(e) => return Err(e),
        };

        let stored = pending.as_ref().and_then(|p| p.state.as_deref());
        let valid = match (state::read(ctx), stored) {
            (Some(presented), Some(stored)) => state::matches(presented, stored),
            _ => false,
        };
        let Some(mut pending) = pending.filter(|_| valid) else {
            return Err(AppError::StateMismatch);
        };

        if options.logout {
            sessions.delete_session(ctx).await?;
        } else {
            pending.state = None;
            sessions
                .set_value(ctx, &key, &serde_json::to_string(&pending)?)
                .await?;
        }

        provider
            .complete_exchange(ctx.query())
            .await
            .map_err(|e| AppError::ExchangeFailed(e.to_string()))
    }

    /// Destroy the session of this request
    pub async fn logout(&self, ctx: &mut RequestContext) -> Result<()> {
        let result = self.session_manager().delete_session(ctx).await;
        match &result {
            Ok(()) => {
                record("logout", "success");
                tracing::info!("Session logged out");
            }
            Err(e) => {
                record("logout", "error");
                tracing::error!(error = %e, "Logout failed");
            }
        }
        result
    }

    /// Store a value in the session of this request
    pub async fn store_in_session(
        &self,
        ctx: &mut RequestContext,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.session_manager().set_value(ctx, key, value).await
    }

    /// Value stored under `key` in the session of this request
    pub async fn get_from_session(&self, ctx: &RequestContext, key: &str) -> Result<String> {
        self.session_manager().get_value(ctx, key).await
    }
}

fn record(step: &str, outcome: &str) {
    AUTH_REQUESTS_TOTAL.with_label_values(&[step, outcome]).inc();
}
