//! git.sr.ht repository operations.

use crate::Client;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::graphql::Operation;
use crate::types::{Repository, RepositoryInput};
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::json;

const REPOSITORY_FIELDS: &str =
    "id name description visibility created updated subject owner { canonicalName username }";

impl Client {
    /// Create a repository owned by the authenticated user.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a bad name (nothing is sent), `Rejected` when
    /// the server refuses it (e.g. the name is taken).
    pub fn create_repository(
        &self,
        ctx: &RequestContext,
        input: &RepositoryInput,
    ) -> Result<Repository> {
        input.validate()?;

        let op = Operation::new(
            "CreateRepo",
            format!(
                "mutation CreateRepo($name: String!, $visibility: Visibility!, $description: String) {{
                    createRepository(name: $name, visibility: $visibility, description: $description) {{ {REPOSITORY_FIELDS} }}
                }}"
            ),
        )
        .var("name", input.name.as_str())
        .var("visibility", input.effective_visibility().wire_name())
        .var_opt("description", input.description.as_deref());

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            create_repository: Option<Repository>,
        }

        let resp: Response = self.router.git().execute(ctx, &op)?;
        let repo = resp.create_repository.ok_or_else(|| {
            Error::InvalidResponse("createRepository returned no repository".to_string())
        })?;
        log::info!("Created repository {} (id {})", repo.name, repo.id);
        Ok(repo)
    }

    /// Look up one of the authenticated user's repositories by name.
    pub fn get_repository(&self, ctx: &RequestContext, name: &str) -> Result<Repository> {
        let op = Operation::new(
            "GetRepo",
            format!(
                "query GetRepo($name: String!) {{
                    me {{ repository(name: $name) {{ {REPOSITORY_FIELDS} }} }}
                }}"
            ),
        )
        .var("name", name);

        #[derive(Deserialize)]
        struct Me {
            repository: Option<Repository>,
        }
        #[derive(Deserialize)]
        struct Response {
            me: Me,
        }

        let resp: Response = self.router.git().execute(ctx, &op)?;
        resp.me
            .repository
            .ok_or_else(|| Error::not_found(format!("repository '{name}'")))
    }

    /// Replace name, description and visibility of repository `id`.
    ///
    /// A missing description clears it on the server.
    pub fn update_repository(
        &self,
        ctx: &RequestContext,
        id: i64,
        input: &RepositoryInput,
    ) -> Result<Repository> {
        input.validate()?;

        let op = Operation::new(
            "UpdateRepo",
            format!(
                "mutation UpdateRepo($id: Int!, $input: RepoInput!) {{
                    updateRepository(id: $id, input: $input) {{ {REPOSITORY_FIELDS} }}
                }}"
            ),
        )
        .var("id", id)
        .var(
            "input",
            json!({
                "name": input.name,
                "description": input.description,
                "visibility": input.effective_visibility(),
            }),
        );

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            update_repository: Option<Repository>,
        }

        let resp: Response = self.router.git().execute(ctx, &op)?;
        let repo = resp
            .update_repository
            .ok_or_else(|| Error::not_found(format!("repository {id}")))?;
        log::info!("Updated repository {} (id {})", repo.name, repo.id);
        Ok(repo)
    }

    /// Delete repository `id`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no such repository exists.
    pub fn delete_repository(&self, ctx: &RequestContext, id: i64) -> Result<()> {
        let op = Operation::new(
            "DeleteRepo",
            "mutation DeleteRepo($id: Int!) { deleteRepository(id: $id) { id } }",
        )
        .var("id", id);

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            delete_repository: Option<IgnoredAny>,
        }

        let resp: Response = self.router.git().execute(ctx, &op)?;
        match resp.delete_repository {
            Some(_) => {
                log::info!("Deleted repository {id}");
                Ok(())
            }
            None => Err(Error::not_found(format!("repository {id}"))),
        }
    }
}
