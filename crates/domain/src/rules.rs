use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validation constraints attachable to a configuration item.
///
/// Rules are checked in declaration order; the first failing rule is
/// reported. `Required` is the only rule that rejects a null/absent value,
/// the others pass on null so optional items can carry format rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    Required,
    Email,
    Url,
    MinLength { value: usize },
    MaxLength { value: usize },
    MinValue { value: f64 },
    MaxValue { value: f64 },
    OneOf { values: Vec<String> },
}

impl ValidationRule {
    /// Short identifier used in error reporting.
    pub fn name(&self) -> &'static str {
        match self {
            ValidationRule::Required => "required",
            ValidationRule::Email => "email",
            ValidationRule::Url => "url",
            ValidationRule::MinLength { .. } => "min_length",
            ValidationRule::MaxLength { .. } => "max_length",
            ValidationRule::MinValue { .. } => "min_value",
            ValidationRule::MaxValue { .. } => "max_value",
            ValidationRule::OneOf { .. } => "one_of",
        }
    }

    /// Check a candidate value, returning a human-readable reason on failure.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            ValidationRule::Required => {
                let empty = match value {
                    Value::Null => true,
                    Value::String(s) => s.is_empty(),
                    _ => false,
                };
                if empty {
                    Err("value is required".to_string())
                } else {
                    Ok(())
                }
            }
            ValidationRule::Email => check_string(value, |s| {
                let mut parts = s.splitn(2, '@');
                let local = parts.next().unwrap_or("");
                let domain = parts.next().unwrap_or("");
                if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') {
                    Ok(())
                } else {
                    Err(format!("'{s}' is not a valid e-mail address"))
                }
            }),
            ValidationRule::Url => check_string(value, |s| {
                if s.starts_with("http://") || s.starts_with("https://") {
                    Ok(())
                } else {
                    Err(format!("'{s}' is not a valid http(s) URL"))
                }
            }),
            ValidationRule::MinLength { value: min } => check_string(value, |s| {
                if s.chars().count() >= *min {
                    Ok(())
                } else {
                    Err(format!("length {} is below minimum {min}", s.chars().count()))
                }
            }),
            ValidationRule::MaxLength { value: max } => check_string(value, |s| {
                if s.chars().count() <= *max {
                    Ok(())
                } else {
                    Err(format!("length {} exceeds maximum {max}", s.chars().count()))
                }
            }),
            ValidationRule::MinValue { value: min } => check_number(value, |n| {
                if n >= *min {
                    Ok(())
                } else {
                    Err(format!("{n} is below minimum {min}"))
                }
            }),
            ValidationRule::MaxValue { value: max } => check_number(value, |n| {
                if n <= *max {
                    Ok(())
                } else {
                    Err(format!("{n} exceeds maximum {max}"))
                }
            }),
            ValidationRule::OneOf { values } => check_string(value, |s| {
                if values.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(format!("'{s}' is not one of {values:?}"))
                }
            }),
        }
    }
}

fn check_string(value: &Value, f: impl Fn(&str) -> Result<(), String>) -> Result<(), String> {
    match value {
        Value::Null => Ok(()),
        Value::String(s) => f(s),
        other => Err(format!("expected a string, got: {other}")),
    }
}

fn check_number(value: &Value, f: impl Fn(f64) -> Result<(), String>) -> Result<(), String> {
    match value {
        Value::Null => Ok(()),
        Value::Number(n) => match n.as_f64() {
            Some(n) => f(n),
            None => Err("number out of range".to_string()),
        },
        other => Err(format!("expected a number, got: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_rejects_null_and_empty() {
        assert!(ValidationRule::Required.check(&Value::Null).is_err());
        assert!(ValidationRule::Required.check(&json!("")).is_err());
        assert!(ValidationRule::Required.check(&json!("x")).is_ok());
        assert!(ValidationRule::Required.check(&json!(0)).is_ok());
    }

    #[test]
    fn test_email() {
        assert!(ValidationRule::Email.check(&json!("a@b.com")).is_ok());
        assert!(ValidationRule::Email.check(&json!("not-an-email")).is_err());
        assert!(ValidationRule::Email.check(&json!("a@b")).is_err());
        // null passes, Required handles absence
        assert!(ValidationRule::Email.check(&Value::Null).is_ok());
    }

    #[test]
    fn test_url() {
        assert!(ValidationRule::Url.check(&json!("https://example.com")).is_ok());
        assert!(ValidationRule::Url.check(&json!("ftp://example.com")).is_err());
    }

    #[test]
    fn test_length_bounds() {
        let min = ValidationRule::MinLength { value: 3 };
        let max = ValidationRule::MaxLength { value: 5 };
        assert!(min.check(&json!("ab")).is_err());
        assert!(min.check(&json!("abc")).is_ok());
        assert!(max.check(&json!("abcdef")).is_err());
        assert!(max.check(&json!("abcde")).is_ok());
    }

    #[test]
    fn test_numeric_bounds() {
        let min = ValidationRule::MinValue { value: 1.0 };
        let max = ValidationRule::MaxValue { value: 10.0 };
        assert!(min.check(&json!(0)).is_err());
        assert!(min.check(&json!(1)).is_ok());
        assert!(max.check(&json!(11)).is_err());
        assert!(max.check(&json!("ten")).is_err());
    }

    #[test]
    fn test_one_of() {
        let rule = ValidationRule::OneOf {
            values: vec!["info".to_string(), "debug".to_string()],
        };
        assert!(rule.check(&json!("info")).is_ok());
        assert!(rule.check(&json!("trace")).is_err());
    }

    #[test]
    fn test_rule_deserializes_from_tagged_form() {
        let rule: ValidationRule =
            serde_json::from_value(json!({"type": "min_length", "value": 4})).unwrap();
        assert_eq!(rule, ValidationRule::MinLength { value: 4 });
    }
}
