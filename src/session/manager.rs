//! Uniform get/set/delete over bound or store-fetched sessions

use tower_sessions::Session;

use super::store::{SessionStore, StoreSession};
use crate::context::RequestContext;
use crate::error::{AppError, Result};
use crate::metrics::SESSION_OPERATIONS_TOTAL;

/// Reads and writes string values in the current request's session
///
/// Each call checks the request for a [`Session`] bound by the session
/// layer. If one is present it is used directly and persisting it is
/// left to the layer. Otherwise a session is fetched from the store,
/// committed when modified, and released before the call returns.
#[derive(Clone, Debug, Default)]
pub struct SessionManager {
    store: SessionStore,
}

impl SessionManager {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Value stored under `key`
    ///
    /// # Errors
    /// - `SessionNotFound` if the session has no such key
    /// - `StoreUnavailable` if the session could not be loaded
    pub async fn get_value(&self, ctx: &RequestContext, key: &str) -> Result<String> {
        let session = ActiveSession::resolve(&self.store, ctx);
        record("get", &session);

        let value = session.get(key).await;
        session.release();

        value?.ok_or(AppError::SessionNotFound)
    }

    /// Store `value` under `key`
    ///
    /// A store-fetched session is committed before this returns, which
    /// may set the session cookie on the response.
    pub async fn set_value(
        &self,
        ctx: &mut RequestContext,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut session = ActiveSession::resolve(&self.store, ctx);
        record("set", &session);

        let result = match session.set(key, value).await {
            Ok(()) => session.persist(ctx).await,
            Err(err) => Err(err),
        };
        session.release();
        result
    }

    /// Destroy the whole session for this request
    ///
    /// A store-fetched session is destroyed in the engine and the
    /// cookie expired, in that order. Destroying an empty or unknown
    /// session succeeds.
    pub async fn delete_session(&self, ctx: &mut RequestContext) -> Result<()> {
        let mut session = ActiveSession::resolve(&self.store, ctx);
        record("delete", &session);

        let result = match session.destroy().await {
            Ok(()) => session.persist(ctx).await,
            Err(err) => Err(err),
        };
        session.release();
        result
    }
}

fn record(operation: &str, session: &ActiveSession) {
    SESSION_OPERATIONS_TOTAL
        .with_label_values(&[operation, session.mode()])
        .inc();
}

/// The session a single manager call operates on
enum ActiveSession {
    /// Bound by the session layer; persisted by it
    Bound(Session),
    /// Fetched for this call; committed and released here
    Fetched(StoreSession),
}

impl ActiveSession {
    fn resolve(store: &SessionStore, ctx: &RequestContext) -> Self {
        match ctx.bound_session() {
            Some(bound) => Self::Bound(bound.clone()),
            None => Self::Fetched(store.fetch(ctx)),
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::Bound(_) => "bound",
            Self::Fetched(_) => "store",
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::Bound(session) => Ok(session.get::<String>(key).await?),
            Self::Fetched(session) => session.get(key).await,
        }
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match self {
            Self::Bound(session) => Ok(session.insert(key, value).await?),
            Self::Fetched(session) => session.set(key, value).await,
        }
    }

    async fn destroy(&mut self) -> Result<()> {
        match self {
            Self::Bound(session) => Ok(session.flush().await?),
            Self::Fetched(session) => session.destroy().await,
        }
    }

    async fn persist(&mut self, ctx: &mut RequestContext) -> Result<()> {
        match self {
            Self::Bound(_) => Ok(()),
            Self::Fetched(session) => session.commit(ctx).await,
        }
    }

    fn release(self) {
        if let Self::Fetched(session) = self {
            session.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::backend::mock::MockBackend;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;
    use tower_sessions::session::Id;
    use tower_sessions::session_store::Error as EngineError;

    /// Carry the response cookies of one request into the next
    fn follow_up(previous: RequestContext) -> RequestContext {
        let jar = previous.into_cookie_jar();
        let mut builder = RequestContext::builder();
        for cookie in jar.iter() {
            builder = builder.cookie(cookie.name().to_owned(), cookie.value().to_owned());
        }
        builder.build()
    }

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let manager = SessionManager::default();

        let mut ctx = RequestContext::default();
        manager.set_value(&mut ctx, "sm-key", "sm-value").await.unwrap();
        assert!(ctx.cookie("session_id").is_some());

        let mut ctx = follow_up(ctx);
        assert_eq!(manager.get_value(&ctx, "sm-key").await.unwrap(), "sm-value");

        manager.delete_session(&mut ctx).await.unwrap();
        let ctx = follow_up(ctx);
        assert!(matches!(
            manager.get_value(&ctx, "sm-key").await,
            Err(AppError::SessionNotFound)
        ));
        assert_eq!(manager.store().live_sessions(), 0);
    }

    #[tokio::test]
    async fn values_round_trip_exactly() {
        let manager = SessionManager::default();
        let large: String = (0..4096).map(|i| char::from(b'A' + (i % 26) as u8)).collect();
        let special = r#"{"token":"eyJhbGciOiJSUzI1NiIs...","refresh":"abc123==","user":{"name":"José García","email":"test@例え.jp"}}"#;
        let rtl = "مرحبا بالعالم שלום עולם";

        let mut ctx = RequestContext::default();
        manager.set_value(&mut ctx, "large", &large).await.unwrap();
        manager.set_value(&mut ctx, "special", special).await.unwrap();
        manager.set_value(&mut ctx, "rtl", rtl).await.unwrap();

        let ctx = follow_up(ctx);
        assert_eq!(manager.get_value(&ctx, "large").await.unwrap(), large);
        assert_eq!(manager.get_value(&ctx, "special").await.unwrap(), special);
        assert_eq!(manager.get_value(&ctx, "rtl").await.unwrap(), rtl);
    }

    #[tokio::test]
    async fn multiple_keys_in_one_request() {
        let manager = SessionManager::default();

        let mut ctx = RequestContext::default();
        for (key, value) in [("key1", "value1"), ("key2", "value2"), ("key3", "value3")] {
            manager.set_value(&mut ctx, key, value).await.unwrap();
        }

        let ctx = follow_up(ctx);
        let mut values = Vec::new();
        for key in ["key1", "key2", "key3"] {
            values.push(manager.get_value(&ctx, key).await.unwrap());
        }
        assert_eq!(values.join(","), "value1,value2,value3");
    }

    #[tokio::test]
    async fn missing_key_is_session_not_found() {
        let manager = SessionManager::default();
        let ctx = RequestContext::default();

        let error = manager.get_value(&ctx, "nonexistent").await.unwrap_err();
        assert!(matches!(error, AppError::SessionNotFound));
        assert_eq!(manager.store().live_sessions(), 0);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let manager = SessionManager::default();

        let mut ctx = RequestContext::default();
        manager.delete_session(&mut ctx).await.unwrap();
        manager.delete_session(&mut ctx).await.unwrap();

        let mut ctx = RequestContext::default();
        manager.set_value(&mut ctx, "user", "john").await.unwrap();
        let mut ctx = follow_up(ctx);
        manager.delete_session(&mut ctx).await.unwrap();
        manager.delete_session(&mut ctx).await.unwrap();
    }

    #[tokio::test]
    async fn bound_session_skips_store() {
        let mut engine = MockBackend::new();
        engine.expect_create().never();
        engine.expect_save().never();
        engine.expect_load().never();
        engine.expect_delete().never();
        let manager = SessionManager::new(SessionStore::new(engine, SessionConfig::default()));

        let bound = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut ctx = RequestContext::builder().bound_session(bound.clone()).build();

        manager.set_value(&mut ctx, "user", "john").await.unwrap();
        assert_eq!(manager.get_value(&ctx, "user").await.unwrap(), "john");
        assert_eq!(
            bound.get::<String>("user").await.unwrap().as_deref(),
            Some("john")
        );
        assert!(ctx.cookie("session_id").is_none());

        manager.delete_session(&mut ctx).await.unwrap();
        assert_eq!(bound.get::<String>("user").await.unwrap(), None);
        assert!(matches!(
            manager.get_value(&ctx, "user").await,
            Err(AppError::SessionNotFound)
        ));
        assert_eq!(manager.store().live_sessions(), 0);
    }

    #[tokio::test]
    async fn load_failure_is_store_unavailable() {
        let mut engine = MockBackend::new();
        engine
            .expect_load()
            .returning(|_| Err(EngineError::Backend("connection refused".to_string())));
        let manager = SessionManager::new(SessionStore::new(engine, SessionConfig::default()));
        let ctx = RequestContext::builder()
            .cookie("session_id", Id(42).to_string())
            .build();

        let error = manager.get_value(&ctx, "user").await.unwrap_err();
        assert!(matches!(error, AppError::StoreUnavailable(_)));
        assert!(!error.is_client_error());
        assert_eq!(manager.store().live_sessions(), 0);
    }

    #[tokio::test]
    async fn commit_failure_propagates_and_releases() {
        let mut engine = MockBackend::new();
        engine
            .expect_create()
            .returning(|_| Err(EngineError::Backend("disk full".to_string())));
        let manager = SessionManager::new(SessionStore::new(engine, SessionConfig::default()));
        let mut ctx = RequestContext::default();

        let error = manager.set_value(&mut ctx, "user", "john").await.unwrap_err();
        assert!(matches!(error, AppError::StoreUnavailable(_)));
        assert_eq!(manager.store().live_sessions(), 0);
        assert!(ctx.cookie("session_id").is_none());
    }

    #[tokio::test]
    async fn destroy_failure_skips_cookie_removal() {
        let mut engine = MockBackend::new();
        engine.expect_load().returning(|id| {
            Ok(Some(tower_sessions::session::Record {
                id: *id,
                data: [("user".to_string(), serde_json::json!("john"))].into(),
                expiry_date: time::OffsetDateTime::now_utc() + time::Duration::hours(1),
            }))
        });
        engine
            .expect_delete()
            .returning(|_| Err(EngineError::Backend("timeout".to_string())));
        let manager = SessionManager::new(SessionStore::new(engine, SessionConfig::default()));
        let cookie = Id(42).to_string();
        let mut ctx = RequestContext::builder()
            .cookie("session_id", cookie.clone())
            .build();

        let error = manager.delete_session(&mut ctx).await.unwrap_err();
        assert!(matches!(error, AppError::StoreUnavailable(_)));
        assert_eq!(ctx.cookie("session_id"), Some(cookie.as_str()));
        assert_eq!(manager.store().live_sessions(), 0);
    }

    #[tokio::test]
    async fn custom_cookie_name_is_used() {
        let config = SessionConfig {
            cookie_name: "__xyz_session".to_string(),
            cookie_secure: true,
            ..SessionConfig::default()
        };
        let manager = SessionManager::new(SessionStore::new(MemoryStore::default(), config));

        let mut ctx = RequestContext::default();
        manager
            .set_value(&mut ctx, "custom-key", "custom-value")
            .await
            .unwrap();

        assert!(ctx.cookie("__xyz_session").is_some());
        assert!(ctx.cookie("session_id").is_none());
    }
}
