//! meta.sr.ht PGP key resource

use anyhow::{Result, bail};
use declarative::{Attributes, ResourceData, ResourceType};
use serde_json::Value;
use srht::PgpKey;
use srht::types::validate_pgp_key;

use super::{
    Api, PGP_KEY, check_keys, deleted, found, numeric_id, preserve_key, required_str,
    same_key_value, set_owner, set_time,
};

/// `sourcehut_user_pgp_key`: an armored PGP public key of the authenticated user
pub struct PgpKeyType {
    api: Api,
}

impl PgpKeyType {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn to_data(&self, key: &PgpKey, recorded: Option<&str>) -> Result<ResourceData> {
        let owner = self.api.owner(&self.api.ctx(), key.user.as_ref())?;

        let mut data = ResourceData::new(PGP_KEY, key.id.to_string())
            .with("key", preserve_key(recorded, &key.key))
            .with("fingerprint", key.fingerprint.as_str());
        set_time(&mut data, "created", Some(key.created));
        set_owner(&mut data, &owner);
        Ok(data)
    }
}

impl ResourceType for PgpKeyType {
    fn name(&self) -> &'static str {
        PGP_KEY
    }

    fn force_new(&self) -> &'static [&'static str] {
        &["key"]
    }

    fn same_value(&self, key: &str, recorded: &Value, declared: &Value) -> bool {
        same_key_value(key, recorded, declared)
    }

    fn validate(&self, config: &Attributes) -> Result<()> {
        check_keys(PGP_KEY, config, &["key"])?;
        validate_pgp_key(required_str(config, "key")?)?;
        Ok(())
    }

    fn create(&self, config: &Attributes) -> Result<ResourceData> {
        let text = required_str(config, "key")?;
        let key = self.api.client().create_pgp_key(&self.api.ctx(), text.trim())?;
        self.to_data(&key, Some(text))
    }

    fn read(&self, current: &ResourceData) -> Result<Option<ResourceData>> {
        let id = numeric_id(current)?;
        let Some(key) = found(self.api.client().get_pgp_key(&self.api.ctx(), id))? else {
            log::info!("PGP key {id} no longer exists");
            return Ok(None);
        };
        self.to_data(&key, current.get_str("key")).map(Some)
    }

    fn update(&self, current: &ResourceData, _config: &Attributes) -> Result<ResourceData> {
        bail!(
            "{} {} cannot be changed in place; changing `key` replaces it",
            PGP_KEY,
            current.id
        )
    }

    fn delete(&self, current: &ResourceData) -> Result<()> {
        let id = numeric_id(current)?;
        deleted(
            &format!("PGP key {id}"),
            self.api.client().delete_pgp_key(&self.api.ctx(), id),
        )
    }
}
