//! Storage and cache abstractions for the persistence layer.
//!
//! Defined here so the overlay engine depends on capabilities, not backends.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use settings_core::SettingsResult;

/// Authoritative store of persisted overrides (database row, file, remote
/// service - opaque to callers).
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Read every persisted key/value pair.
    async fn read_all(&self) -> SettingsResult<HashMap<String, Value>>;

    /// Write one key/value pair through to storage.
    async fn write(&self, key: &str, value: &Value) -> SettingsResult<()>;
}

/// Named-blob cache with per-entry TTL. `ttl: None` means no expiry.
#[async_trait]
pub trait SettingsCache: Send + Sync {
    async fn get(&self, key: &str) -> SettingsResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, payload: &[u8], ttl: Option<Duration>) -> SettingsResult<()>;

    async fn delete(&self, key: &str) -> SettingsResult<()>;
}
