//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Flat attribute map of a resource, keyed by attribute name.
pub type Attributes = BTreeMap<String, Value>;

/// Recorded state of one managed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Registered resource type name (e.g. "sourcehut_repository")
    pub resource_type: String,
    /// Remote identifier used to read the resource back
    pub id: String,
    /// Declared and computed attributes
    #[serde(default)]
    pub attributes: Attributes,
}

impl ResourceData {
    /// Create resource data with no attributes
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes: Attributes::new(),
        }
    }

    /// Set an attribute, dropping it when the value is null
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        match value.into() {
            Value::Null => {
                self.attributes.remove(key);
            }
            value => {
                self.attributes.insert(key.to_string(), value);
            }
        }
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// String attribute, if present
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Integer attribute, if present
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_i64)
    }
}

/// A resource as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declared {
    /// Unique address, `<type>.<label>`
    pub address: String,
    /// Registered resource type name
    pub resource_type: String,
    /// Declared attributes only
    pub config: Attributes,
}

impl Declared {
    /// Declare `resource_type.label` with `config`
    pub fn new(resource_type: &str, label: &str, config: Attributes) -> Self {
        Self {
            address: format!("{resource_type}.{label}"),
            resource_type: resource_type.to_string(),
            config,
        }
    }
}

/// Result of applying one change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was updated in place
    Modified,
    /// Resource was destroyed and created again
    Replaced,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Replaced | Self::Removed
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub replaced: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.replaced + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of changes applied concurrently
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_null_removes_attribute() {
        let mut data = ResourceData::new("t", "1").with("description", "x");
        assert_eq!(data.get_str("description"), Some("x"));

        data.set("description", Value::Null);
        assert!(!data.attributes.contains_key("description"));
    }

    #[test]
    fn test_typed_getters() {
        let data = ResourceData::new("t", "1")
            .with("id", 42)
            .with("name", "dotfiles");
        assert_eq!(data.get_i64("id"), Some(42));
        assert_eq!(data.get_str("name"), Some("dotfiles"));
        assert_eq!(data.get_str("id"), None);
    }

    #[test]
    fn test_declared_address() {
        let declared = Declared::new("sourcehut_repository", "dotfiles", Attributes::new());
        assert_eq!(declared.address, "sourcehut_repository.dotfiles");
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        for result in [
            ApplyResult::Created,
            ApplyResult::Replaced,
            ApplyResult::NoChange,
            ApplyResult::Failed { error: "x".into() },
        ] {
            summary.add_result(&result);
        }
        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_resource_data_serde() {
        let data = ResourceData::new("t", "7").with("created_unix", 1_700_000_000);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["attributes"]["created_unix"], json!(1_700_000_000));
        let back: ResourceData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }
}
