use std::path::Path;

use serde::{Deserialize, Serialize};
use settings_core::{BaseSettings, SettingsError, SettingsResult};
use settings_domain::{ConfigItem, ItemRegistry, ValidationRule};
use settings_overlay::{CachePolicy, CacheTtl};

/// Bootstrap configuration for the CLI: where storage and cache live, the
/// cache key/TTL, the base defaults file, and the persistable item
/// declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Optional TOML/JSON file holding base default values.
    #[serde(default)]
    pub defaults_file: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL; falls back to an in-process cache when unset.
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_cache_key")]
    pub key: String,
    /// Entry lifetime in seconds; omit for no expiry.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key: default_cache_key(),
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

/// One `[[items]]` table in the bootstrap file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDeclaration {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub rules: Vec<ValidationRule>,
}

fn default_database_path() -> String {
    "sqlite://settings.db".to_string()
}

fn default_cache_key() -> String {
    "settings:overlay:v1".to_string()
}

fn default_ttl_seconds() -> Option<u64> {
    Some(300)
}

impl AppConfig {
    pub fn load(path: Option<&str>) -> SettingsResult<Self> {
        let path = path.unwrap_or("config/settings.toml");
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::File(format!("Failed to read config file '{path}': {e}")))?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SettingsResult<()> {
        if self.storage.database_path.trim().is_empty() {
            return Err(SettingsError::Configuration(
                "storage.database_path must not be empty".to_string(),
            ));
        }
        if self.cache.key.trim().is_empty() {
            return Err(SettingsError::Configuration(
                "cache.key must not be empty".to_string(),
            ));
        }
        if self.cache.ttl_seconds == Some(0) {
            return Err(SettingsError::Configuration(
                "cache.ttl_seconds must be positive; omit it for no expiry".to_string(),
            ));
        }
        Ok(())
    }

    pub fn registry(&self) -> SettingsResult<ItemRegistry> {
        let mut registry = ItemRegistry::new();
        for item in &self.items {
            registry.register(
                &item.key,
                ConfigItem::new(&item.label).with_rules(item.rules.clone()),
            )?;
        }
        Ok(registry)
    }

    pub fn base_settings(&self) -> SettingsResult<BaseSettings> {
        match &self.defaults_file {
            Some(path) => BaseSettings::load_from_file(Path::new(path)),
            None => Ok(BaseSettings::new()),
        }
    }

    pub fn cache_policy(&self) -> SettingsResult<CachePolicy> {
        let ttl = match self.cache.ttl_seconds {
            Some(seconds) => CacheTtl::from_secs(seconds),
            None => CacheTtl::Forever,
        };
        CachePolicy::new(&self.cache.key, ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
            defaults_file = "config/defaults.toml"

            [storage]
            database_path = "sqlite://data/settings.db"

            [cache]
            redis_url = "redis://127.0.0.1:6379"
            key = "settings:overlay:v2"
            ttl_seconds = 600

            [[items]]
            key = "mail.contact.address"
            label = "Contact e-mail address"
            rules = [{ type = "required" }, { type = "email" }]

            [[items]]
            key = "mail.retries"
            label = "Delivery retries"
            rules = [{ type = "min_value", value = 0.0 }]
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.storage.database_path, "sqlite://data/settings.db");
        assert_eq!(config.cache.key, "settings:overlay:v2");
        assert_eq!(config.cache.ttl_seconds, Some(600));

        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 2);
        let item = registry.get("mail.contact.address").unwrap();
        assert_eq!(item.rules, vec![ValidationRule::Required, ValidationRule::Email]);
    }

    #[test]
    fn test_defaults_when_sections_omitted() {
        let config: AppConfig = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.storage.database_path, "sqlite://settings.db");
        assert_eq!(config.cache.key, "settings:overlay:v1");
        assert_eq!(config.cache.ttl_seconds, Some(300));
        assert!(config.cache.redis_url.is_none());
        assert!(config.items.is_empty());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config: AppConfig = toml::from_str("[cache]\nttl_seconds = 0").unwrap();
        assert!(matches!(
            config.validate(),
            Err(SettingsError::Configuration(_))
        ));
    }

    #[test]
    fn test_duplicate_item_rejected() {
        let config: AppConfig = toml::from_str(
            r#"
            [[items]]
            key = "a.b"
            label = "first"

            [[items]]
            key = "a.b"
            label = "second"
            "#,
        )
        .unwrap();
        assert!(config.registry().is_err());
    }
}
