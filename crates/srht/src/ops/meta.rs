//! meta.sr.ht operations: SSH keys, PGP keys and the user profile.

use crate::Client;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::graphql::{Operation, Page};
use crate::ops::{collect_pages, find_in_pages};
use crate::types::{PgpKey, PgpKeySummary, SshKey, User, validate_pgp_key, validate_ssh_key};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::IgnoredAny;

const SSH_KEY_FIELDS: &str =
    "id created lastUsed key fingerprint comment user { canonicalName username }";
const PGP_KEY_FIELDS: &str = "id created key fingerprint user { canonicalName username }";

// =============================================================================
// API response types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: i64,
    username: String,
    canonical_name: String,
    created: DateTime<Utc>,
    email: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    pgp_keys: Option<Page<PgpKeySummary>>,
}

impl UserResponse {
    fn into_user(self, pgp_keys: Vec<PgpKeySummary>) -> User {
        User {
            id: self.id,
            username: self.username,
            canonical_name: self.canonical_name,
            created: self.created,
            email: self.email,
            url: self.url.filter(|s| !s.is_empty()),
            location: self.location.filter(|s| !s.is_empty()),
            bio: self.bio.filter(|s| !s.is_empty()),
            pgp_keys,
        }
    }
}

impl Client {
    // -------------------------------------------------------------------------
    // SSH keys
    // -------------------------------------------------------------------------

    /// Authorize an SSH public key for the authenticated user.
    pub fn create_ssh_key(&self, ctx: &RequestContext, key: &str) -> Result<SshKey> {
        validate_ssh_key(key)?;

        let op = Operation::new(
            "CreateSSHKey",
            format!(
                "mutation CreateSSHKey($key: String!) {{ createSSHKey(key: $key) {{ {SSH_KEY_FIELDS} }} }}"
            ),
        )
        .var("key", key.trim());

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            #[serde(rename = "createSSHKey")]
            create_ssh_key: Option<SshKey>,
        }

        let resp: Response = self.router.meta().execute(ctx, &op)?;
        let key = resp
            .create_ssh_key
            .ok_or_else(|| Error::InvalidResponse("createSSHKey returned no key".to_string()))?;
        log::info!("Created SSH key {} ({})", key.id, key.fingerprint);
        Ok(key)
    }

    /// Find one of the authenticated user's SSH keys by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when no key with that id is listed.
    pub fn get_ssh_key(&self, ctx: &RequestContext, id: i64) -> Result<SshKey> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Me {
            ssh_keys: Page<SshKey>,
        }
        #[derive(Deserialize)]
        struct Response {
            me: Me,
        }

        let client = self.router.meta();
        find_in_pages(
            ctx,
            &format!("SSH key {id}"),
            |cursor| {
                let op = Operation::new(
                    "GetSSHKeys",
                    format!(
                        "query GetSSHKeys($cursor: Cursor) {{
                            me {{ sshKeys(cursor: $cursor) {{ results {{ {SSH_KEY_FIELDS} }} cursor }} }}
                        }}"
                    ),
                )
                .var_opt("cursor", cursor);
                let resp: Response = client.execute(ctx, &op)?;
                Ok(resp.me.ssh_keys)
            },
            |key| key.id == id,
        )
    }

    /// Revoke SSH key `id`.
    pub fn delete_ssh_key(&self, ctx: &RequestContext, id: i64) -> Result<()> {
        let op = Operation::new(
            "DeleteSSHKey",
            "mutation DeleteSSHKey($id: Int!) { deleteSSHKey(id: $id) { id } }",
        )
        .var("id", id);

        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "deleteSSHKey")]
            deleted: Option<IgnoredAny>,
        }

        let resp: Response = self.router.meta().execute(ctx, &op)?;
        resp.deleted
            .map(|_| log::info!("Deleted SSH key {id}"))
            .ok_or_else(|| Error::not_found(format!("SSH key {id}")))
    }

    // -------------------------------------------------------------------------
    // PGP keys
    // -------------------------------------------------------------------------

    /// Register an ASCII-armored PGP public key for the authenticated user.
    pub fn create_pgp_key(&self, ctx: &RequestContext, key: &str) -> Result<PgpKey> {
        validate_pgp_key(key)?;

        let op = Operation::new(
            "CreatePGPKey",
            format!(
                "mutation CreatePGPKey($key: String!) {{ createPGPKey(key: $key) {{ {PGP_KEY_FIELDS} }} }}"
            ),
        )
        .var("key", key);

        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "createPGPKey")]
            created: Option<PgpKey>,
        }

        let resp: Response = self.router.meta().execute(ctx, &op)?;
        let key = resp
            .created
            .ok_or_else(|| Error::InvalidResponse("createPGPKey returned no key".to_string()))?;
        log::info!("Created PGP key {} ({})", key.id, key.fingerprint);
        Ok(key)
    }

    /// Find one of the authenticated user's PGP keys by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when no key with that id is listed.
    pub fn get_pgp_key(&self, ctx: &RequestContext, id: i64) -> Result<PgpKey> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Me {
            pgp_keys: Page<PgpKey>,
        }
        #[derive(Deserialize)]
        struct Response {
            me: Me,
        }

        let client = self.router.meta();
        find_in_pages(
            ctx,
            &format!("PGP key {id}"),
            |cursor| {
                let op = Operation::new(
                    "GetPGPKeys",
                    format!(
                        "query GetPGPKeys($cursor: Cursor) {{
                            me {{ pgpKeys(cursor: $cursor) {{ results {{ {PGP_KEY_FIELDS} }} cursor }} }}
                        }}"
                    ),
                )
                .var_opt("cursor", cursor);
                let resp: Response = client.execute(ctx, &op)?;
                Ok(resp.me.pgp_keys)
            },
            |key| key.id == id,
        )
    }

    /// Remove PGP key `id`.
    pub fn delete_pgp_key(&self, ctx: &RequestContext, id: i64) -> Result<()> {
        let op = Operation::new(
            "DeletePGPKey",
            "mutation DeletePGPKey($id: Int!) { deletePGPKey(id: $id) { id } }",
        )
        .var("id", id);

        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "deletePGPKey")]
            deleted: Option<IgnoredAny>,
        }

        let resp: Response = self.router.meta().execute(ctx, &op)?;
        resp.deleted
            .map(|_| log::info!("Deleted PGP key {id}"))
            .ok_or_else(|| Error::not_found(format!("PGP key {id}")))
    }

    // -------------------------------------------------------------------------
    // Profile
    // -------------------------------------------------------------------------

    /// The profile of the user the token belongs to.
    ///
    /// The profile query carries the first page of PGP keys; later pages
    /// are fetched by cursor.
    pub fn get_current_user(&self, ctx: &RequestContext) -> Result<User> {
        let op = Operation::new(
            "GetCurrentUser",
            "query GetCurrentUser {
                me {
                    id username canonicalName created email url location bio
                    pgpKeys { results { id key fingerprint } cursor }
                }
            }",
        );

        #[derive(Deserialize)]
        struct Response {
            me: Option<UserResponse>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct KeysMe {
            pgp_keys: Page<PgpKeySummary>,
        }
        #[derive(Deserialize)]
        struct KeysResponse {
            me: KeysMe,
        }

        let client = self.router.meta();
        let resp: Response = client.execute(ctx, &op)?;
        let mut user = resp
            .me
            .ok_or_else(|| Error::InvalidResponse("query returned no user".to_string()))?;

        let mut first = user.pgp_keys.take();
        let pgp_keys = collect_pages(ctx, "PGP keys of the current user", |cursor| {
            let Some(cursor) = cursor else {
                return Ok(first.take().unwrap_or(Page {
                    results: Vec::new(),
                    cursor: None,
                }));
            };
            let op = Operation::new(
                "GetUserPGPKeys",
                "query GetUserPGPKeys($cursor: Cursor) {
                    me { pgpKeys(cursor: $cursor) { results { id key fingerprint } cursor } }
                }",
            )
            .var("cursor", cursor);
            let resp: KeysResponse = client.execute(ctx, &op)?;
            Ok(resp.me.pgp_keys)
        })?;

        Ok(user.into_user(pgp_keys))
    }
}
