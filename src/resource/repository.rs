//! git.sr.ht repository resource

use anyhow::Result;
use declarative::{Attributes, ResourceData, ResourceType};
use serde_json::Value;
use srht::{Repository, RepositoryInput, Visibility};

use super::{
    Api, REPOSITORY, check_keys, deleted, found, numeric_id, optional_str, required_str, set_owner,
    set_time,
};

const CONFIG_KEYS: &[&str] = &["name", "description", "visibility"];

/// `sourcehut_repository`: a repository owned by the authenticated user
///
/// Recorded id is the numeric repository id; lookups go by name, which is
/// also the import id.
pub struct RepositoryType {
    api: Api,
}

impl RepositoryType {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn input(config: &Attributes) -> Result<RepositoryInput> {
        let mut input = RepositoryInput::new(required_str(config, "name")?);
        if let Some(description) = optional_str(config, "description")? {
            input = input.description(description);
        }
        if let Some(visibility) = optional_str(config, "visibility")? {
            input = input.visibility(visibility.parse::<Visibility>()?);
        }
        Ok(input)
    }

    fn lookup(&self, name: &str) -> Result<Option<ResourceData>> {
        let ctx = self.api.ctx();
        match found(self.api.client().get_repository(&ctx, name))? {
            Some(repo) => Ok(Some(self.to_data(&repo)?)),
            None => {
                log::info!("Repository {name} no longer exists");
                Ok(None)
            }
        }
    }

    fn to_data(&self, repo: &Repository) -> Result<ResourceData> {
        let owner = self.api.owner(&self.api.ctx(), repo.owner.as_ref())?;

        let mut data = ResourceData::new(REPOSITORY, repo.id.to_string())
            .with("id", repo.id)
            .with("name", repo.name.as_str())
            .with("description", repo.description.as_deref())
            .with("visibility", repo.visibility.as_str())
            .with("updated", repo.updated.to_rfc3339())
            .with("subject", repo.subject.as_deref());
        set_time(&mut data, "created", Some(repo.created));
        set_owner(&mut data, &owner);
        Ok(data)
    }
}

impl ResourceType for RepositoryType {
    fn name(&self) -> &'static str {
        REPOSITORY
    }

    fn defaults(&self) -> Attributes {
        Attributes::from([(
            "visibility".to_string(),
            Value::from(Visibility::default().as_str()),
        )])
    }

    fn validate(&self, config: &Attributes) -> Result<()> {
        check_keys(REPOSITORY, config, CONFIG_KEYS)?;
        Self::input(config)?.validate()?;
        Ok(())
    }

    fn create(&self, config: &Attributes) -> Result<ResourceData> {
        let input = Self::input(config)?;
        let repo = self.api.client().create_repository(&self.api.ctx(), &input)?;
        self.to_data(&repo)
    }

    fn read(&self, current: &ResourceData) -> Result<Option<ResourceData>> {
        let name = current.get_str("name").unwrap_or(&current.id);
        self.lookup(name)
    }

    fn update(&self, current: &ResourceData, config: &Attributes) -> Result<ResourceData> {
        let id = numeric_id(current)?;
        let input = Self::input(config)?;
        let repo = self
            .api
            .client()
            .update_repository(&self.api.ctx(), id, &input)?;
        self.to_data(&repo)
    }

    fn delete(&self, current: &ResourceData) -> Result<()> {
        let id = numeric_id(current)?;
        deleted(
            &format!("Repository {id}"),
            self.api.client().delete_repository(&self.api.ctx(), id),
        )
    }

    fn import(&self, id: &str) -> Result<Option<ResourceData>> {
        self.lookup(id)
    }
}
