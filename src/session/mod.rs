//! Session management
//!
//! Handles:
//! - Shared handle to any `tower_sessions` engine (in-memory default)
//! - Cookie-correlated store with scoped session handles and a layer
//!   binding a session to each request
//! - Session manager working on bound or store-fetched sessions
//! - The process-wide default manager

mod backend;
mod manager;
mod store;

use std::sync::RwLock;

use lazy_static::lazy_static;

pub use backend::SharedBackend;
pub use manager::SessionManager;
pub use store::{SessionStore, StoreSession};
pub use tower_sessions::{MemoryStore, Session};

lazy_static! {
    static ref MANAGER: RwLock<SessionManager> = RwLock::new(SessionManager::default());
}

/// The process-wide session manager
///
/// Starts out backed by [`SessionStore::default`] until replaced with
/// [`use_manager`].
pub fn manager() -> SessionManager {
    match MANAGER.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the process-wide session manager
///
/// Every later call to [`manager`] sees the new one. Swap before
/// serving traffic; requests already running keep the manager they
/// started with.
pub fn use_manager(manager: SessionManager) {
    match MANAGER.write() {
        Ok(mut guard) => *guard = manager,
        Err(poisoned) => *poisoned.into_inner() = manager,
    }
    tracing::info!("Process-wide session manager replaced");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::context::RequestContext;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn default_manager_is_usable() {
        let mut ctx = RequestContext::default();
        manager().set_value(&mut ctx, "key", "value").await.unwrap();
        assert!(ctx.cookie("session_id").is_some());
    }

    #[tokio::test]
    #[serial]
    async fn use_manager_replaces_default() {
        let original = manager();

        let config = SessionConfig {
            cookie_name: "custom_session".to_string(),
            cookie_secure: true,
            ..SessionConfig::default()
        };
        use_manager(SessionManager::new(SessionStore::new(
            MemoryStore::default(),
            config,
        )));

        let mut ctx = RequestContext::default();
        manager()
            .set_value(&mut ctx, "custom-key", "custom-value")
            .await
            .unwrap();
        assert!(ctx.cookie("custom_session").is_some());

        use_manager(original);
        assert_eq!(manager().store().config().cookie_name, "session_id");
    }
}
