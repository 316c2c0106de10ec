use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use settings_core::{SettingsError, SettingsResult};

use crate::rules::ValidationRule;

/// One persistable configuration entry: a human-readable label plus the
/// validation rules applied on administrative writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub label: String,
    #[serde(default)]
    pub rules: Vec<ValidationRule>,
}

impl ConfigItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<ValidationRule>) -> Self {
        self.rules = rules;
        self
    }
}

/// Allow-list of keys eligible for persistence. Keys are dotted paths,
/// validated eagerly at registration; declaration order is irrelevant.
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    items: HashMap<String, ConfigItem>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    /// Register an item under a dotted key. Fails fast on a malformed key
    /// or a duplicate registration.
    pub fn register(&mut self, key: impl Into<String>, item: ConfigItem) -> SettingsResult<()> {
        let key = key.into();
        validate_dotted_key(&key)?;
        if self.items.contains_key(&key) {
            return Err(SettingsError::Configuration(format!(
                "Duplicate item registration: {key}"
            )));
        }
        self.items.insert(key, item);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ConfigItem> {
        self.items.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn validate_dotted_key(key: &str) -> SettingsResult<()> {
    if key.is_empty() {
        return Err(SettingsError::Configuration(
            "Item key must not be empty".to_string(),
        ));
    }

    let valid = key.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    });

    if valid {
        Ok(())
    } else {
        Err(SettingsError::Configuration(format!(
            "Invalid dotted item key: '{key}'"
        )))
    }
}
