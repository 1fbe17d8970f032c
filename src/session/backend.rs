//! Shared handle to the session storage engine
//!
//! Any [`tower_sessions::SessionStore`] (memory, SQL, Redis, ...) can
//! back the bridge. One engine instance serves both the session layer
//! and store-fetched sessions.

use std::sync::Arc;

use async_trait::async_trait;
use tower_sessions::SessionStore as Engine;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;

/// Cloneable, type-erased session engine
#[derive(Clone, Debug)]
pub struct SharedBackend(Arc<dyn Engine>);

impl SharedBackend {
    pub fn new(engine: impl Engine) -> Self {
        Self(Arc::new(engine))
    }
}

impl From<Arc<dyn Engine>> for SharedBackend {
    fn from(engine: Arc<dyn Engine>) -> Self {
        Self(engine)
    }
}

#[async_trait]
impl Engine for SharedBackend {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.0.create(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.0.save(record).await
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        self.0.load(session_id).await
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.0.delete(session_id).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tower_sessions::MemoryStore;

    #[tokio::test]
    async fn clones_share_one_engine() {
        let backend = SharedBackend::new(MemoryStore::default());
        let other = backend.clone();

        let mut record = Record {
            id: Id(7),
            data: HashMap::from([("user".to_string(), serde_json::json!("john"))]),
            expiry_date: time::OffsetDateTime::now_utc() + time::Duration::hours(1),
        };
        backend.create(&mut record).await.unwrap();

        let loaded = other.load(&record.id).await.unwrap().expect("shared record");
        assert_eq!(loaded.data["user"], "john");

        other.delete(&record.id).await.unwrap();
        assert!(backend.load(&record.id).await.unwrap().is_none());
    }
}
