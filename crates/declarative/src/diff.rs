//! Attribute diffing between declared configuration and refreshed state

use crate::types::Attributes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One attribute whose declared value differs from the recorded one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDiff {
    /// Attribute name
    pub key: String,
    /// Recorded value, `None` if not recorded
    pub old: Option<Value>,
    /// Declared value
    pub new: Value,
    /// Whether this change requires replacement
    pub forces_new: bool,
}

/// Diff declared attributes against recorded ones.
///
/// Only keys present in `config` are compared, so computed attributes
/// never show up as changes. A declared `null` matches a missing key.
pub fn diff_attributes(
    config: &Attributes,
    current: &Attributes,
    force_new: &[&str],
) -> Vec<AttributeDiff> {
    diff_attributes_with(config, current, force_new, |_, old, new| old == new)
}

/// [`diff_attributes`] with a custom equality for recorded values.
///
/// `same(key, recorded, declared)` decides whether a recorded value
/// satisfies the declared one.
pub fn diff_attributes_with(
    config: &Attributes,
    current: &Attributes,
    force_new: &[&str],
    same: impl Fn(&str, &Value, &Value) -> bool,
) -> Vec<AttributeDiff> {
    config
        .iter()
        .filter_map(|(key, new)| {
            let old = current.get(key);
            let same = match old {
                Some(old) => same(key, old, new),
                None => new.is_null(),
            };
            (!same).then(|| AttributeDiff {
                key: key.clone(),
                old: old.cloned(),
                new: new.clone(),
                forces_new: force_new.contains(&key.as_str()),
            })
        })
        .collect()
}

/// Merge `defaults` under `config`: declared values win.
pub fn with_defaults(config: &Attributes, defaults: Attributes) -> Attributes {
    let mut merged = defaults;
    for (key, value) in config {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Short human-readable rendering of an attribute value
pub fn display_value(value: &Value) -> String {
    const MAX: usize = 60;
    let text = match value {
        Value::String(s) => format!("\"{}\"", s.lines().next().unwrap_or_default()),
        other => other.to_string(),
    };
    if text.chars().count() > MAX {
        let head: String = text.chars().take(MAX).collect();
        format!("{head}...")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_only_declared_keys_are_compared() {
        let config = attrs(&[("name", json!("dotfiles"))]);
        let current = attrs(&[("name", json!("dotfiles")), ("id", json!(42))]);
        assert!(diff_attributes(&config, &current, &[]).is_empty());
    }

    #[test]
    fn test_changed_value() {
        let config = attrs(&[("visibility", json!("private"))]);
        let current = attrs(&[("visibility", json!("public"))]);
        let diffs = diff_attributes(&config, &current, &[]);

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].old, Some(json!("public")));
        assert_eq!(diffs[0].new, json!("private"));
        assert!(!diffs[0].forces_new);
    }

    #[test]
    fn test_missing_recorded_value() {
        let config = attrs(&[("description", json!("hi")), ("comment", Value::Null)]);
        let diffs = diff_attributes(&config, &Attributes::new(), &[]);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].key, "description");
        assert!(diffs[0].old.is_none());
    }

    #[test]
    fn test_force_new_flag() {
        let config = attrs(&[("key", json!("ssh-ed25519 BBBB"))]);
        let current = attrs(&[("key", json!("ssh-ed25519 AAAA"))]);
        let diffs = diff_attributes(&config, &current, &["key"]);
        assert!(diffs[0].forces_new);
    }

    #[test]
    fn test_custom_equality() {
        let config = attrs(&[("key", json!("ssh-ed25519 AAAA\n")), ("name", json!("a"))]);
        let current = attrs(&[("key", json!("ssh-ed25519 AAAA")), ("name", json!("b"))]);
        let trimmed = |key: &str, old: &Value, new: &Value| match (key, old, new) {
            ("key", Value::String(old), Value::String(new)) => old.trim() == new.trim(),
            _ => old == new,
        };

        let diffs = diff_attributes_with(&config, &current, &["key"], trimmed);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].key, "name");
    }

    #[test]
    fn test_defaults_are_overridden() {
        let merged = with_defaults(
            &attrs(&[("visibility", json!("private"))]),
            attrs(&[("visibility", json!("public")), ("x", json!(1))]),
        );
        assert_eq!(merged["visibility"], json!("private"));
        assert_eq!(merged["x"], json!(1));
    }

    #[test]
    fn test_display_value_truncates() {
        let long = json!("-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmQINBGE...");
        assert_eq!(display_value(&long), "\"-----BEGIN PGP PUBLIC KEY BLOCK-----\"");
        assert_eq!(display_value(&json!(3)), "3");
        assert!(display_value(&json!("x".repeat(100))).ends_with("..."));
    }
}
