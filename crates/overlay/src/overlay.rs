use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use settings_core::{BaseSettings, SettingsError, SettingsResult};
use settings_domain::{ItemRegistry, SettingsCache, SettingsRepository};
use tracing::{debug, warn};

use crate::policy::CachePolicy;

/// How a `load` materialized the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Merged view was already materialized in this process.
    AlreadyLoaded,
    /// Overrides restored from the cache entry.
    CacheHit { overrides: usize },
    /// Cache miss; overrides fetched from storage and written back to cache.
    StorageRead { overrides: usize },
    /// Storage unavailable; serving base-only values until invalidated.
    Degraded,
}

struct OverlayState {
    loaded: bool,
    /// Persisted subset currently applied over the defaults. This is what
    /// gets serialized into the cache entry.
    overrides: HashMap<String, Value>,
}

/// Configuration view that merges persisted overrides onto base defaults,
/// cached under a single key.
///
/// Reads for keys outside the item registry pass through to the base
/// defaults untouched; such keys are never persisted or cached. The merged
/// view is materialized at most once per process (single-flight) unless
/// explicitly invalidated.
pub struct PersistentOverlay {
    defaults: BaseSettings,
    view: tokio::sync::RwLock<BaseSettings>,
    repository: Arc<dyn SettingsRepository>,
    cache: Arc<dyn SettingsCache>,
    registry: ItemRegistry,
    policy: CachePolicy,
    loaded: AtomicBool,
    state: tokio::sync::Mutex<OverlayState>,
}

impl PersistentOverlay {
    pub(crate) fn new(
        defaults: BaseSettings,
        repository: Arc<dyn SettingsRepository>,
        cache: Arc<dyn SettingsCache>,
        registry: ItemRegistry,
        policy: CachePolicy,
    ) -> Self {
        Self {
            view: tokio::sync::RwLock::new(defaults.clone()),
            defaults,
            repository,
            cache,
            registry,
            policy,
            loaded: AtomicBool::new(false),
            state: tokio::sync::Mutex::new(OverlayState {
                loaded: false,
                overrides: HashMap::new(),
            }),
        }
    }

    /// Effective value for `key`: the persisted override if one exists, the
    /// base default otherwise. Triggers `load` on first use.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.ensure_loaded().await;
        let view = self.view.read().await;
        view.get(key).cloned()
    }

    pub async fn has(&self, key: &str) -> bool {
        self.ensure_loaded().await;
        let view = self.view.read().await;
        view.has(key)
    }

    /// Snapshot of the whole merged tree.
    pub async fn all(&self) -> Value {
        self.ensure_loaded().await;
        let view = self.view.read().await;
        view.all()
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    /// Materialize the merged view: cache first, storage on miss. Idempotent;
    /// concurrent callers share one round trip. Storage failures degrade to
    /// base-only values rather than propagating, so startup never hard-fails
    /// on persistence being down.
    pub async fn load(&self) -> LoadOutcome {
        if self.loaded.load(Ordering::Acquire) {
            return LoadOutcome::AlreadyLoaded;
        }
        let mut state = self.state.lock().await;
        if state.loaded {
            return LoadOutcome::AlreadyLoaded;
        }
        self.load_locked(&mut state).await
    }

    async fn ensure_loaded(&self) {
        if self.loaded.load(Ordering::Acquire) {
            return;
        }
        let mut state = self.state.lock().await;
        if !state.loaded {
            self.load_locked(&mut state).await;
        }
    }

    async fn load_locked(&self, state: &mut OverlayState) -> LoadOutcome {
        let cache_key = self.policy.key();

        match self
            .cache_op("read", self.cache.get(cache_key))
            .await
        {
            Ok(Some(payload)) => match serde_json::from_slice::<HashMap<String, Value>>(&payload) {
                Ok(overrides) => {
                    let applied = self.apply_overrides(state, overrides).await;
                    self.mark_loaded(state);
                    debug!("Restored {} overrides from cache entry '{}'", applied, cache_key);
                    return LoadOutcome::CacheHit { overrides: applied };
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry '{}': {e}", cache_key);
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Cache read failed, treating as miss: {e}");
            }
        }

        let persisted = match self
            .storage_op("read", self.repository.read_all())
            .await
        {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Storage read failed, serving base-only configuration: {e}");
                self.mark_loaded(state);
                return LoadOutcome::Degraded;
            }
        };

        let applied = self.apply_overrides(state, persisted).await;
        self.mark_loaded(state);
        self.write_cache_entry(state).await;
        debug!("Loaded {} overrides from storage", applied);
        LoadOutcome::StorageRead { overrides: applied }
    }

    /// Administrative write-through. Validates against the item's rules,
    /// persists, then updates the in-process view and the cache entry. On
    /// validation or storage failure nothing is mutated; cache failures are
    /// logged and swallowed.
    pub async fn set(&self, key: &str, value: Value) -> SettingsResult<()> {
        let mut state = self.state.lock().await;
        if !state.loaded {
            self.load_locked(&mut state).await;
        }

        let item = self.registry.get(key).ok_or_else(|| {
            SettingsError::Configuration(format!("Key '{key}' is not registered for persistence"))
        })?;

        for rule in &item.rules {
            rule.check(&value).map_err(|message| SettingsError::Validation {
                key: key.to_string(),
                rule: rule.name().to_string(),
                message,
            })?;
        }

        self.storage_op("write", self.repository.write(key, &value))
            .await?;

        state.overrides.insert(key.to_string(), value.clone());
        {
            let mut view = self.view.write().await;
            view.set(key, value);
        }
        self.write_cache_entry(&state).await;
        Ok(())
    }

    /// Drop the cache entry and the in-process merged view; the next read
    /// re-queries storage.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if let Err(e) = self
            .cache_op("delete", self.cache.delete(self.policy.key()))
            .await
        {
            warn!("Cache delete failed during invalidation: {e}");
        }
        state.loaded = false;
        state.overrides.clear();
        self.loaded.store(false, Ordering::Release);
        let mut view = self.view.write().await;
        *view = self.defaults.clone();
    }

    /// Maintenance operation: delete the cache entry and rebuild it from
    /// storage eagerly. Unlike `load`, failures propagate so the caller can
    /// report them. Returns the number of persisted overrides applied.
    pub async fn rebuild_cache(&self) -> SettingsResult<usize> {
        let mut state = self.state.lock().await;

        self.cache_op("delete", self.cache.delete(self.policy.key()))
            .await?;

        let persisted = self
            .storage_op("read", self.repository.read_all())
            .await?;

        let applied = self.apply_overrides(&mut state, persisted).await;
        self.mark_loaded(&mut state);

        let payload = serde_json::to_vec(&state.overrides)?;
        self.cache_op(
            "write",
            self.cache
                .set(self.policy.key(), &payload, self.policy.ttl().as_duration()),
        )
        .await?;

        debug!("Rebuilt cache entry '{}' with {} overrides", self.policy.key(), applied);
        Ok(applied)
    }

    /// Reset the view to pristine defaults and apply the registry-restricted
    /// subset of `candidate` overrides. Returns how many were applied.
    async fn apply_overrides(
        &self,
        state: &mut OverlayState,
        candidate: HashMap<String, Value>,
    ) -> usize {
        let mut overrides = HashMap::with_capacity(candidate.len());
        for (key, value) in candidate {
            if self.registry.contains(&key) {
                overrides.insert(key, value);
            } else {
                debug!("Ignoring persisted value for unregistered key '{}'", key);
            }
        }

        let mut view = self.view.write().await;
        *view = self.defaults.clone();
        for (key, value) in &overrides {
            view.set(key, value.clone());
        }
        let applied = overrides.len();
        state.overrides = overrides;
        applied
    }

    fn mark_loaded(&self, state: &mut OverlayState) {
        state.loaded = true;
        self.loaded.store(true, Ordering::Release);
    }

    /// Serialize the override subset into the cache entry. Never fatal.
    async fn write_cache_entry(&self, state: &OverlayState) {
        let payload = match serde_json::to_vec(&state.overrides) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize overrides for caching: {e}");
                return;
            }
        };

        if let Err(e) = self
            .cache_op(
                "write",
                self.cache
                    .set(self.policy.key(), &payload, self.policy.ttl().as_duration()),
            )
            .await
        {
            warn!("Failed to populate settings cache: {e}");
        }
    }

    async fn storage_op<T, F>(&self, what: &str, fut: F) -> SettingsResult<T>
    where
        F: Future<Output = SettingsResult<T>>,
    {
        let timeout = self.policy.op_timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SettingsError::Storage(format!(
                "Storage {what} timed out after {timeout:?}"
            ))),
        }
    }

    async fn cache_op<T, F>(&self, what: &str, fut: F) -> SettingsResult<T>
    where
        F: Future<Output = SettingsResult<T>>,
    {
        let timeout = self.policy.op_timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SettingsError::Cache(format!(
                "Cache {what} timed out after {timeout:?}"
            ))),
        }
    }
}
