pub mod config;
pub mod grading;
pub mod readiness;
pub mod scoring;
pub mod selector;
pub mod session;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::engine::config::EngineConfig;
use crate::engine::readiness::DeckReadinessCache;
use crate::store::Store;

/// Time source of the engine. Injected so TTL and decay behaviour is
/// testable without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct MasteryEngine {
    config: Arc<RwLock<EngineConfig>>,
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    session_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    record_locks: Arc<Mutex<HashMap<(String, String), Arc<Mutex<()>>>>>,
    readiness_cache: DeckReadinessCache,
}

impl MasteryEngine {
    pub fn new(config: EngineConfig, store: Arc<Store>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            store,
            clock,
            session_locks: Arc::new(Mutex::new(HashMap::new())),
            record_locks: Arc::new(Mutex::new(HashMap::new())),
            readiness_cache: DeckReadinessCache::new(),
        }
    }

    pub async fn reload_config(&self, new_config: EngineConfig) -> Result<(), String> {
        new_config.validate()?;
        let mut cfg = self.config.write().await;
        *cfg = new_config;
        tracing::info!("Engine config reloaded");
        Ok(())
    }

    pub async fn get_config(&self) -> EngineConfig {
        self.config.read().await.clone()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Serializes all mutating operations of one session. Concurrent calls
    /// for different sessions stay independent.
    pub(crate) async fn acquire_session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;

        // Periodically prune entries that are no longer held by anyone.
        // Arc::strong_count == 1 means only the HashMap holds a reference,
        // so the lock is idle and can be safely removed.
        if locks.len() > 1000 {
            locks.retain(|_, v| Arc::strong_count(v) > 1);
        }

        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Serializes the load-fold-upsert cycle on one performance record.
    /// A learner can hold several sessions over the same deck (two browser
    /// tabs), so the session lock alone does not protect the record.
    pub(crate) async fn acquire_record_lock(
        &self,
        user_id: &str,
        flashcard_id: &str,
    ) -> Arc<Mutex<()>> {
        let mut locks = self.record_locks.lock().await;

        if locks.len() > 1000 {
            locks.retain(|_, v| Arc::strong_count(v) > 1);
        }

        locks
            .entry((user_id.to_string(), flashcard_id.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine() -> (MasteryEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("engine.sled").to_str().unwrap()).unwrap());
        (MasteryEngine::new(EngineConfig::default(), store), dir)
    }

    #[tokio::test]
    async fn reload_rejects_invalid_config_and_keeps_the_old_one() {
        let (engine, _dir) = test_engine();
        let old_ttl = engine.get_config().await.readiness.cache_ttl_secs;

        let mut bad = EngineConfig::default();
        bad.scoring.max_coverage_per_card = 0.0;
        assert!(engine.reload_config(bad).await.is_err());
        assert_eq!(engine.get_config().await.readiness.cache_ttl_secs, old_ttl);

        let mut good = EngineConfig::default();
        good.readiness.cache_ttl_secs = 5;
        engine.reload_config(good).await.unwrap();
        assert_eq!(engine.get_config().await.readiness.cache_ttl_secs, 5);
    }

    #[tokio::test]
    async fn session_locks_are_shared_per_session() {
        let (engine, _dir) = test_engine();
        let a = engine.acquire_session_lock("s1").await;
        let b = engine.acquire_session_lock("s1").await;
        let c = engine.acquire_session_lock("s2").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn record_locks_are_shared_per_user_and_flashcard() {
        let (engine, _dir) = test_engine();
        let a = engine.acquire_record_lock("u1", "f1").await;
        let b = engine.acquire_record_lock("u1", "f1").await;
        let other_card = engine.acquire_record_lock("u1", "f2").await;
        let other_user = engine.acquire_record_lock("u2", "f1").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other_card));
        assert!(!Arc::ptr_eq(&a, &other_user));
    }
}
