use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::Value;
use settings_core::SettingsResult;
use settings_domain::{SettingsCache, SettingsRepository};

/// In-memory settings repository, used in tests and embedded setups with no
/// external database.
#[derive(Default)]
pub struct InMemorySettingsRepository {
    entries: Arc<tokio::sync::RwLock<HashMap<String, Value>>>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a persisted value, bypassing the write path.
    pub async fn seed(&self, key: &str, value: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn read_all(&self) -> SettingsResult<HashMap<String, Value>> {
        let entries = self.entries.read().await;
        Ok(entries.clone())
    }

    async fn write(&self, key: &str, value: &Value) -> SettingsResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

struct CacheEntry {
    payload: Vec<u8>,
    stored_at: SystemTime,
    ttl: Option<Duration>,
}

impl CacheEntry {
    fn expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.stored_at.elapsed().unwrap_or(Duration::MAX) >= ttl,
            None => false,
        }
    }
}

/// In-memory blob cache with TTL expiry, checked on read.
#[derive(Default)]
pub struct InMemorySettingsCache {
    entries: Arc<tokio::sync::RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemorySettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).is_some_and(|entry| !entry.expired())
    }

    pub async fn size(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }
}

#[async_trait]
impl SettingsCache for InMemorySettingsCache {
    async fn get(&self, key: &str) -> SettingsResult<Option<Vec<u8>>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.expired())
            .map(|entry| entry.payload.clone()))
    }

    async fn set(&self, key: &str, payload: &[u8], ttl: Option<Duration>) -> SettingsResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                payload: payload.to_vec(),
                stored_at: SystemTime::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> SettingsResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}
