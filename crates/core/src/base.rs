use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::{SettingsError, SettingsResult};

/// In-process default configuration, a nested JSON tree addressed by dotted
/// paths ("mail.contact.address"). Overlay code writes persisted overrides
/// into this tree so reads after a load are plain tree lookups.
#[derive(Debug, Clone, Default)]
pub struct BaseSettings {
    root: Map<String, Value>,
}

impl BaseSettings {
    pub fn new() -> Self {
        Self { root: Map::new() }
    }

    /// Build from an already-parsed JSON value; the top level must be an object.
    pub fn from_value(value: Value) -> SettingsResult<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(SettingsError::Configuration(format!(
                "Base settings must be a table/object, got: {other}"
            ))),
        }
    }

    /// Load defaults from a TOML or JSON file, selected by extension.
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::File(format!("Failed to read defaults file: {e}")))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        let value: Value = match extension {
            "toml" => {
                let parsed: toml::Value = toml::from_str(&content)
                    .map_err(|e| SettingsError::Configuration(format!("TOML parse error: {e}")))?;
                serde_json::to_value(parsed)?
            }
            "json" => serde_json::from_str(&content)
                .map_err(|e| SettingsError::Configuration(format!("JSON parse error: {e}")))?,
            _ => {
                return Err(SettingsError::Configuration(format!(
                    "Unsupported defaults file format: {extension}"
                )))
            }
        };

        Self::from_value(value)
    }

    /// Look up a value by dotted path.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;

        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Write a value at a dotted path, creating intermediate tables as needed.
    /// A non-object intermediate is replaced (last write wins).
    pub fn set(&mut self, key: &str, value: Value) {
        let segments: Vec<&str> = key.split('.').collect();
        let mut current = &mut self.root;

        for segment in &segments[..segments.len() - 1] {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = entry.as_object_mut().expect("just ensured object");
        }

        current.insert(segments[segments.len() - 1].to_string(), value);
    }

    /// The whole tree as a JSON object.
    pub fn all(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Flatten the tree into a dotted-path map of leaf values.
    pub fn flatten(&self) -> HashMap<String, Value> {
        let mut result = HashMap::new();
        flatten_into(&mut result, "", &self.root);
        result
    }

    /// Merge another tree over this one; objects merge recursively, scalars
    /// from `other` win.
    pub fn merge(&mut self, other: &BaseSettings) {
        for (key, value) in &other.root {
            match (self.root.get_mut(key), value) {
                (Some(existing), Value::Object(_)) if existing.is_object() => {
                    if let Some(merged) = deep_merge(existing, value) {
                        *existing = merged;
                    }
                }
                _ => {
                    self.root.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

fn flatten_into(result: &mut HashMap<String, Value>, prefix: &str, table: &Map<String, Value>) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(result, &path, nested),
            _ => {
                result.insert(path, value.clone());
            }
        }
    }
}

fn deep_merge(base: &Value, override_val: &Value) -> Option<Value> {
    match (base, override_val) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in override_map {
                if let Some(base_value) = base_map.get(key) {
                    if let Some(merged_value) = deep_merge(base_value, value) {
                        merged.insert(key.clone(), merged_value);
                    } else {
                        merged.insert(key.clone(), value.clone());
                    }
                } else {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(Value::Object(merged))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_dotted_get_and_set() {
        let mut settings = BaseSettings::new();
        settings.set("mail.contact.address", json!("ops@example.com"));
        settings.set("mail.retries", json!(3));

        assert_eq!(
            settings.get("mail.contact.address"),
            Some(&json!("ops@example.com"))
        );
        assert_eq!(settings.get("mail.retries"), Some(&json!(3)));
        assert!(settings.get("mail.contact.missing").is_none());
        assert!(settings.get("unknown").is_none());
        assert!(settings.has("mail.contact.address"));
    }

    #[test]
    fn test_set_overwrites_scalar_intermediate() {
        let mut settings = BaseSettings::new();
        settings.set("app.name", json!("demo"));
        settings.set("app.name.inner", json!(1));

        assert_eq!(settings.get("app.name.inner"), Some(&json!(1)));
        assert!(settings.get("app.name").unwrap().is_object());
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        let result = BaseSettings::from_value(json!([1, 2, 3]));
        assert!(matches!(result, Err(SettingsError::Configuration(_))));
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[mail.contact]\naddress = \"a@b.com\"\n[app]\nport = 8080").unwrap();

        let settings = BaseSettings::load_from_file(file.path()).unwrap();
        assert_eq!(settings.get("mail.contact.address"), Some(&json!("a@b.com")));
        assert_eq!(settings.get("app.port"), Some(&json!(8080)));
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{}", r#"{"app": {"name": "demo"}}"#).unwrap();

        let settings = BaseSettings::load_from_file(file.path()).unwrap();
        assert_eq!(settings.get("app.name"), Some(&json!("demo")));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let result = BaseSettings::load_from_file(file.path());
        assert!(matches!(result, Err(SettingsError::Configuration(_))));
    }

    #[test]
    fn test_flatten() {
        let mut settings = BaseSettings::new();
        settings.set("a.b", json!(1));
        settings.set("a.c", json!("x"));
        settings.set("d", json!(true));

        let flat = settings.flatten();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat.get("a.b"), Some(&json!(1)));
        assert_eq!(flat.get("a.c"), Some(&json!("x")));
        assert_eq!(flat.get("d"), Some(&json!(true)));
    }

    #[test]
    fn test_merge_deep() {
        let mut base = BaseSettings::from_value(json!({
            "mail": {"retries": 3, "contact": {"address": "old@b.com"}}
        }))
        .unwrap();
        let overlay = BaseSettings::from_value(json!({
            "mail": {"contact": {"address": "new@b.com"}}
        }))
        .unwrap();

        base.merge(&overlay);
        assert_eq!(base.get("mail.contact.address"), Some(&json!("new@b.com")));
        assert_eq!(base.get("mail.retries"), Some(&json!(3)));
    }
}
