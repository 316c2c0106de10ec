use std::sync::Arc;

use settings_core::{BaseSettings, SettingsError, SettingsResult};
use settings_domain::{ItemRegistry, SettingsCache, SettingsRepository};

use crate::overlay::PersistentOverlay;
use crate::policy::CachePolicy;

/// Assembles a [`PersistentOverlay`] from explicit parts. The embedding
/// application supplies storage, cache, registry, and cache policy directly;
/// there is no container or inheritance involved.
#[derive(Default)]
pub struct OverlayBuilder {
    base: BaseSettings,
    repository: Option<Arc<dyn SettingsRepository>>,
    cache: Option<Arc<dyn SettingsCache>>,
    registry: ItemRegistry,
    policy: Option<CachePolicy>,
}

impl OverlayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base defaults the persisted values overlay onto. Defaults to empty.
    pub fn with_base(mut self, base: BaseSettings) -> Self {
        self.base = base;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn SettingsRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn SettingsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_registry(mut self, registry: ItemRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn build(self) -> SettingsResult<PersistentOverlay> {
        let repository = self.repository.ok_or_else(|| {
            SettingsError::Configuration("Overlay requires a settings repository".to_string())
        })?;
        let cache = self.cache.ok_or_else(|| {
            SettingsError::Configuration("Overlay requires a settings cache".to_string())
        })?;
        let policy = self.policy.ok_or_else(|| {
            SettingsError::Configuration("Overlay requires a cache policy".to_string())
        })?;

        Ok(PersistentOverlay::new(
            self.base,
            repository,
            cache,
            self.registry,
            policy,
        ))
    }
}
