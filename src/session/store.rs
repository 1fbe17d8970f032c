//! Cookie-correlated session store and its scoped session handles

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum_extra::extract::cookie::Cookie;
use tower_sessions::session::Id;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

use super::backend::SharedBackend;
use crate::config::SessionConfig;
use crate::context::RequestContext;
use crate::error::Result;

/// Session engine plus the cookie settings that correlate requests
/// to stored sessions
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: SharedBackend,
    config: SessionConfig,
    /// Handles fetched but not yet released
    live: AtomicUsize,
}

impl SessionStore {
    pub fn new(engine: impl tower_sessions::SessionStore, config: SessionConfig) -> Self {
        Self::with_backend(SharedBackend::new(engine), config)
    }

    pub fn with_backend(backend: SharedBackend, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend,
                config,
                live: AtomicUsize::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Number of fetched sessions that have not been released yet
    pub fn live_sessions(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Layer binding a [`Session`] to every request over this store
    ///
    /// The layer loads the session before the handler runs and saves
    /// it, or expires its cookie, afterwards.
    pub fn layer(&self) -> SessionManagerLayer<SharedBackend> {
        let config = &self.inner.config;

        let mut layer = SessionManagerLayer::new(self.inner.backend.clone())
            .with_name(config.cookie_name.clone())
            .with_path(config.cookie_path.clone())
            .with_secure(config.cookie_secure)
            .with_http_only(config.cookie_http_only)
            .with_same_site(config.cookie_same_site.into())
            .with_expiry(config.expiry());

        if let Some(domain) = &config.cookie_domain {
            layer = layer.with_domain(domain.clone());
        }

        layer
    }

    /// Session identified by the request's session cookie
    ///
    /// Loading is deferred to the first read or write. An absent or
    /// malformed cookie, or an id the engine no longer knows, yields a
    /// fresh session. The handle is released when dropped or via
    /// [`StoreSession::release`].
    pub fn fetch(&self, ctx: &RequestContext) -> StoreSession {
        let config = &self.inner.config;

        let id = ctx
            .cookie(&config.cookie_name)
            .and_then(|value| value.parse::<Id>().ok());

        let session = Session::new(
            id,
            Arc::new(self.inner.backend.clone()),
            Some(config.expiry()),
        );

        self.inner.live.fetch_add(1, Ordering::SeqCst);

        StoreSession {
            store: self.clone(),
            session,
            destroyed: false,
        }
    }

    fn session_cookie(&self, id: &Id) -> Cookie<'static> {
        let config = &self.inner.config;

        let mut builder = Cookie::build((config.cookie_name.clone(), id.to_string()))
            .path(config.cookie_path.clone())
            .http_only(config.cookie_http_only)
            .secure(config.cookie_secure)
            .same_site(config.cookie_same_site.into());

        if let Some(domain) = &config.cookie_domain {
            builder = builder.domain(domain.clone());
        }

        if !config.cookie_session_only {
            builder = builder.max_age(config.idle_timeout());
        }

        builder.build()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        let config = &self.inner.config;

        let mut builder =
            Cookie::build((config.cookie_name.clone(), "")).path(config.cookie_path.clone());
        if let Some(domain) = &config.cookie_domain {
            builder = builder.domain(domain.clone());
        }

        builder.build()
    }
}

impl Default for SessionStore {
    /// [`MemoryStore`] with [`SessionConfig::default`]
    fn default() -> Self {
        Self::new(MemoryStore::default(), SessionConfig::default())
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.inner.config)
            .field("live_sessions", &self.live_sessions())
            .finish_non_exhaustive()
    }
}

/// Session fetched from a [`SessionStore`] for the span of one call
///
/// Changes stay local until [`commit`](Self::commit). Dropping the
/// handle releases it back to the store exactly once.
pub struct StoreSession {
    store: SessionStore,
    session: Session,
    destroyed: bool,
}

impl StoreSession {
    /// Engine id; `None` until the session has been committed
    pub fn id(&self) -> Option<Id> {
        self.session.id()
    }

    /// # Errors
    /// `StoreUnavailable` if the engine fails or the value is not a string
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.session.get::<String>(key).await?)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.session.insert(key, value).await?)
    }

    /// Remove the session from the engine and clear its contents
    pub async fn destroy(&mut self) -> Result<()> {
        self.session.flush().await?;
        self.destroyed = true;
        Ok(())
    }

    /// Persist the session and update the session cookie
    ///
    /// After [`destroy`](Self::destroy) this expires the cookie instead.
    pub async fn commit(&mut self, ctx: &mut RequestContext) -> Result<()> {
        if self.destroyed {
            ctx.remove_cookie(self.store.removal_cookie());
            return Ok(());
        }

        self.session.save().await?;

        if let Some(id) = self.session.id() {
            ctx.add_cookie(self.store.session_cookie(&id));
        }
        Ok(())
    }

    /// Hand the session back to the store
    pub fn release(self) {}
}

impl Drop for StoreSession {
    fn drop(&mut self) {
        self.store.inner.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for StoreSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSession")
            .field("id", &self.session.id())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}
