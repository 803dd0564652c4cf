//! Resource type trait and provider registry
//!
//! A [`ResourceType`] knows how to create, read, update and delete one
//! kind of remote object. A [`Provider`] is the set of resource types the
//! planner and executor can dispatch to by name.

use crate::types::{Attributes, ResourceData};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle operations for one kind of managed resource
///
/// Implementations translate between flat [`Attributes`] and a remote API.
/// `read` returning `Ok(None)` means the remote object no longer exists;
/// any `Err` is a hard failure of the step.
///
/// # Example
///
/// ```ignore
/// struct Note;
///
/// impl ResourceType for Note {
///     fn name(&self) -> &'static str { "note" }
///
///     fn create(&self, config: &Attributes) -> Result<ResourceData> {
///         let id = notes::create(config)?;
///         Ok(ResourceData::new("note", id))
///     }
///
///     fn read(&self, current: &ResourceData) -> Result<Option<ResourceData>> {
///         Ok(notes::get(&current.id)?.map(|n| n.into()))
///     }
///
///     fn update(&self, current: &ResourceData, config: &Attributes) -> Result<ResourceData> {
///         notes::update(&current.id, config)
///     }
///
///     fn delete(&self, current: &ResourceData) -> Result<()> {
///         notes::delete(&current.id)
///     }
/// }
/// ```
pub trait ResourceType: Send + Sync {
    /// Registered type name, also the address prefix
    fn name(&self) -> &'static str;

    /// Attributes whose change requires destroying and recreating
    fn force_new(&self) -> &'static [&'static str] {
        &[]
    }

    /// Values assumed for optional attributes the configuration omits
    fn defaults(&self) -> Attributes {
        Attributes::new()
    }

    /// Whether a recorded attribute value satisfies the declared one
    ///
    /// Exact equality unless the remote API normalizes the attribute.
    fn same_value(&self, _key: &str, recorded: &Value, declared: &Value) -> bool {
        recorded == declared
    }

    /// Reject invalid configuration before anything is planned
    fn validate(&self, _config: &Attributes) -> Result<()> {
        Ok(())
    }

    /// Create the remote object and return its full state
    fn create(&self, config: &Attributes) -> Result<ResourceData>;

    /// Refresh recorded state; `None` when the object is gone
    fn read(&self, current: &ResourceData) -> Result<Option<ResourceData>>;

    /// Apply `config` in place and return the new state
    fn update(&self, current: &ResourceData, config: &Attributes) -> Result<ResourceData>;

    /// Destroy the remote object; an already-missing object is success
    fn delete(&self, current: &ResourceData) -> Result<()>;

    /// Adopt an existing remote object by its import id
    fn import(&self, id: &str) -> Result<Option<ResourceData>> {
        self.read(&ResourceData::new(self.name(), id))
    }
}

/// Registry of resource types by name
#[derive(Default, Clone)]
pub struct Provider {
    types: BTreeMap<&'static str, Arc<dyn ResourceType>>,
}

impl Provider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type under its own name
    pub fn register(&mut self, resource_type: impl ResourceType + 'static) {
        let resource_type: Arc<dyn ResourceType> = Arc::new(resource_type);
        self.types.insert(resource_type.name(), resource_type);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, resource_type: impl ResourceType + 'static) -> Self {
        self.register(resource_type);
        self
    }

    /// Look up a resource type
    pub fn get(&self, name: &str) -> Result<Arc<dyn ResourceType>> {
        self.types.get(name).cloned().with_context(|| {
            format!(
                "Unknown resource type '{name}' (known: {})",
                self.names().join(", ")
            )
        })
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.types.keys().copied().collect()
    }

    /// Adopt an existing remote object into state
    ///
    /// The address must be `<type>.<label>` for a registered type.
    pub fn import(&self, address: &str, id: &str) -> Result<ResourceData> {
        let (type_name, label) = address
            .split_once('.')
            .filter(|(_, label)| !label.is_empty())
            .with_context(|| format!("Invalid address '{address}', expected <type>.<label>"))?;
        let resource_type = self.get(type_name)?;

        log::info!("Importing {address} ({label}) from id {id}");
        resource_type
            .import(id)?
            .with_context(|| format!("Cannot import {address}: no {type_name} with id '{id}'"))
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("types", &self.names())
            .finish()
    }
}
