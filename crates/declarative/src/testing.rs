//! In-memory resource type for tests

use crate::resource::ResourceType;
use crate::types::{Attributes, ResourceData};
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Attributes from string pairs
pub fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::from(*v)))
        .collect()
}

#[derive(Default)]
struct Store {
    objects: Mutex<BTreeMap<String, Attributes>>,
    next_id: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

/// Resource type backed by a shared map; clones see the same objects.
#[derive(Clone)]
pub struct MemoryType {
    name: &'static str,
    force_new: &'static [&'static str],
    store: Arc<Store>,
}

impl MemoryType {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            force_new: &[],
            store: Arc::default(),
        }
    }

    pub fn with_force_new(mut self, fields: &'static [&'static str]) -> Self {
        self.force_new = fields;
        self
    }

    /// Insert an object directly, returning its id
    pub fn insert(&self, pairs: &[(&str, &str)]) -> String {
        let id = (self.store.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        self.store
            .objects
            .lock()
            .unwrap()
            .insert(id.clone(), attrs(pairs));
        id
    }

    pub fn get(&self, id: &str) -> Option<ResourceData> {
        let objects = self.store.objects.lock().unwrap();
        objects.get(id).map(|attributes| ResourceData {
            resource_type: self.name.to_string(),
            id: id.to_string(),
            attributes: attributes.clone(),
        })
    }

    pub fn remove(&self, id: &str) {
        self.store.objects.lock().unwrap().remove(id);
    }

    pub fn len(&self) -> usize {
        self.store.objects.lock().unwrap().len()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.store.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.store.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<()> {
        if self.store.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("write refused");
        }
        Ok(())
    }
}

impl ResourceType for MemoryType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn force_new(&self) -> &'static [&'static str] {
        self.force_new
    }

    fn validate(&self, config: &Attributes) -> Result<()> {
        if config.get("title").and_then(Value::as_str) == Some("") {
            anyhow::bail!("title must not be empty");
        }
        Ok(())
    }

    fn create(&self, config: &Attributes) -> Result<ResourceData> {
        self.check_writes()?;
        let id = (self.store.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        self.store
            .objects
            .lock()
            .unwrap()
            .insert(id.clone(), config.clone());
        self.get(&id)
            .ok_or_else(|| anyhow::anyhow!("object {id} vanished"))
    }

    fn read(&self, current: &ResourceData) -> Result<Option<ResourceData>> {
        if self.store.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("read refused");
        }
        Ok(self.get(&current.id))
    }

    fn update(&self, current: &ResourceData, config: &Attributes) -> Result<ResourceData> {
        self.check_writes()?;
        let mut objects = self.store.objects.lock().unwrap();
        let object = objects
            .get_mut(&current.id)
            .ok_or_else(|| anyhow::anyhow!("object {} not found", current.id))?;
        object.extend(config.clone());
        drop(objects);
        self.get(&current.id)
            .ok_or_else(|| anyhow::anyhow!("object {} vanished", current.id))
    }

    fn delete(&self, current: &ResourceData) -> Result<()> {
        self.check_writes()?;
        self.remove(&current.id);
        Ok(())
    }
}
