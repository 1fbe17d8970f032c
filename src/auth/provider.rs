//! Identity provider boundary and registry

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, Result};
use crate::params::Params;

/// User returned by a provider after a successful exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Name of the provider that authenticated the user
    pub provider: String,
    /// Provider's unique user identifier
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub nick_name: String,
    pub description: String,
    pub avatar_url: String,
    pub location: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub id_token: String,
    /// Unmapped profile fields as returned by the provider
    pub raw_data: HashMap<String, serde_json::Value>,
}

impl User {
    /// Identifying fields safe to hand to the browser (no tokens)
    pub fn profile(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": self.provider,
            "user_id": self.user_id,
            "email": self.email,
            "name": self.name,
            "nick_name": self.nick_name,
            "avatar_url": self.avatar_url,
        })
    }
}

/// Failure reported by a provider; the message reaches the client as-is
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A named OAuth/OpenID identity provider
///
/// Implementations own the wire protocol: building the authorization
/// URL and exchanging the callback parameters for a user. Timeouts and
/// retries are theirs to handle.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Registry name, e.g. "google"
    fn name(&self) -> &str;

    /// Authorization URL the browser is sent to, carrying `state`
    fn authorization_url(&self, state: &str) -> std::result::Result<String, ProviderError>;

    /// Exchange the callback parameters (code, ...) for a user
    async fn complete_exchange(&self, params: &Params) -> std::result::Result<User, ProviderError>;
}

/// Providers available to the login flow, keyed by name
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register providers, replacing any with the same name
    pub fn use_providers<I>(&self, providers: I)
    where
        I: IntoIterator<Item = Arc<dyn Provider>>,
    {
        let mut registered = self.write();
        for provider in providers {
            tracing::debug!(provider = %provider.name(), "Registering provider");
            registered.insert(provider.name().to_owned(), provider);
        }
    }

    pub fn register(&self, provider: impl Provider) {
        self.use_providers([Arc::new(provider) as Arc<dyn Provider>]);
    }

    /// # Errors
    /// `UnknownProvider` if nothing is registered under `name`
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::UnknownProvider(name.to_owned()))
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Provider>>> {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Provider>>> {
        self.providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
