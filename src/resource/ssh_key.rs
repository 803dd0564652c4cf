//! meta.sr.ht SSH key resource

use anyhow::{Result, bail};
use declarative::{Attributes, ResourceData, ResourceType};
use serde_json::Value;
use srht::SshKey;
use srht::types::validate_ssh_key;

use super::{
    Api, SSH_KEY, check_keys, deleted, found, numeric_id, preserve_key, required_str,
    same_key_value, set_owner, set_time,
};

/// `sourcehut_user_ssh_key`: an SSH public key of the authenticated user
///
/// The key text is the only configurable attribute and changing it
/// replaces the key.
pub struct SshKeyType {
    api: Api,
}

impl SshKeyType {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn to_data(&self, key: &SshKey, recorded: Option<&str>) -> Result<ResourceData> {
        let owner = self.api.owner(&self.api.ctx(), key.user.as_ref())?;

        let mut data = ResourceData::new(SSH_KEY, key.id.to_string())
            .with("key", preserve_key(recorded, &key.key))
            .with("fingerprint", key.fingerprint.as_str())
            .with("comment", key.comment.as_deref());
        set_time(&mut data, "created", Some(key.created));
        set_time(&mut data, "last_used", key.last_used);
        set_owner(&mut data, &owner);
        Ok(data)
    }
}

impl ResourceType for SshKeyType {
    fn name(&self) -> &'static str {
        SSH_KEY
    }

    fn force_new(&self) -> &'static [&'static str] {
        &["key"]
    }

    fn same_value(&self, key: &str, recorded: &Value, declared: &Value) -> bool {
        same_key_value(key, recorded, declared)
    }

    fn validate(&self, config: &Attributes) -> Result<()> {
        check_keys(SSH_KEY, config, &["key"])?;
        validate_ssh_key(required_str(config, "key")?)?;
        Ok(())
    }

    fn create(&self, config: &Attributes) -> Result<ResourceData> {
        let text = required_str(config, "key")?;
        let key = self.api.client().create_ssh_key(&self.api.ctx(), text.trim())?;
        self.to_data(&key, Some(text))
    }

    fn read(&self, current: &ResourceData) -> Result<Option<ResourceData>> {
        let id = numeric_id(current)?;
        let Some(key) = found(self.api.client().get_ssh_key(&self.api.ctx(), id))? else {
            log::info!("SSH key {id} no longer exists");
            return Ok(None);
        };
        self.to_data(&key, current.get_str("key")).map(Some)
    }

    fn update(&self, current: &ResourceData, _config: &Attributes) -> Result<ResourceData> {
        bail!(
            "{} {} cannot be changed in place; changing `key` replaces it",
            SSH_KEY,
            current.id
        )
    }

    fn delete(&self, current: &ResourceData) -> Result<()> {
        let id = numeric_id(current)?;
        deleted(
            &format!("SSH key {id}"),
            self.api.client().delete_ssh_key(&self.api.ctx(), id),
        )
    }
}
