//! Entity types returned by the sourcehut APIs.
//!
//! All of these are snapshots: nothing is cached or mutated locally, a
//! fresh copy comes back from every call.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Visibility
// =============================================================================

/// Who can see a repository or paste.
///
/// Lowercase locally (`"public"`), UPPERCASE on the wire (`"PUBLIC"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Listed and visible to everyone.
    #[default]
    Public,
    /// Visible to anyone with the link, not listed.
    Unlisted,
    /// Visible only to the owner and collaborators.
    Private,
}

impl Visibility {
    /// All visibility values.
    #[must_use]
    pub fn all() -> &'static [Visibility] {
        &[Visibility::Public, Visibility::Unlisted, Visibility::Private]
    }

    /// Local (lowercase) name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        }
    }

    /// Wire (uppercase) name, as used in GraphQL variables.
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Unlisted => "UNLISTED",
            Visibility::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = Error;

    /// Accepts either casing; rejects anything else.
    fn from_str(s: &str) -> Result<Self> {
        Visibility::all()
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::invalid(
                    "visibility",
                    format!("'{s}' is not one of public, unlisted, private"),
                )
            })
    }
}

// =============================================================================
// Users
// =============================================================================

/// Reference to the user owning an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    /// Numeric user id, when the query asked for it.
    #[serde(default)]
    pub id: Option<i64>,
    /// Plain username (e.g. "example").
    pub username: String,
    /// Username with the ownership sigil (e.g. "~example").
    pub canonical_name: String,
}

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Numeric id.
    pub id: i64,
    /// Plain username.
    pub username: String,
    /// Username prefixed with `~`.
    pub canonical_name: String,
    /// Account creation time.
    pub created: DateTime<Utc>,
    /// Email address.
    pub email: String,
    /// Profile URL.
    pub url: Option<String>,
    /// Free-form location.
    pub location: Option<String>,
    /// Free-form bio.
    pub bio: Option<String>,
    /// PGP keys registered to the account.
    pub pgp_keys: Vec<PgpKeySummary>,
}

impl User {
    /// Reference to this user.
    #[must_use]
    pub fn to_user_ref(&self) -> UserRef {
        UserRef {
            id: Some(self.id),
            username: self.username.clone(),
            canonical_name: self.canonical_name.clone(),
        }
    }
}

/// PGP key as listed on a user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgpKeySummary {
    /// Numeric id.
    pub id: i64,
    /// Armored key material.
    pub key: String,
    /// Key fingerprint.
    pub fingerprint: String,
}

// =============================================================================
// Repositories
// =============================================================================

/// A git.sr.ht repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Numeric id, used for update and delete.
    pub id: i64,
    /// Name, unique per owner.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Visibility.
    pub visibility: Visibility,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Last update time.
    pub updated: DateTime<Utc>,
    /// Subject line, when the server provides one.
    #[serde(default)]
    pub subject: Option<String>,
    /// Owner, when the query asked for it.
    #[serde(default)]
    pub owner: Option<UserRef>,
}

/// Desired name, description and visibility of a repository.
///
/// Updates replace all three fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepositoryInput {
    /// Repository name.
    pub name: String,
    /// Description; `None` clears it on update.
    pub description: Option<String>,
    /// Visibility; `None` means public.
    pub visibility: Option<Visibility>,
}

impl RepositoryInput {
    /// Input with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the visibility.
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Visibility to send, defaulting to public.
    #[must_use]
    pub fn effective_visibility(&self) -> Visibility {
        self.visibility.unwrap_or_default()
    }

    /// Reject input the server would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        validate_repo_name(&self.name)
    }
}

/// Check a repository name: letters, digits, `.`, `_` and `-`, not `.`/`..`.
pub fn validate_repo_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid("name", "repository name is required"));
    }
    if name == "." || name == ".." {
        return Err(Error::invalid("name", format!("'{name}' is reserved")));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(Error::invalid(
            "name",
            format!("'{name}' contains invalid character '{bad}'"),
        ));
    }
    Ok(())
}

// =============================================================================
// Keys
// =============================================================================

/// An SSH public key registered with meta.sr.ht.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKey {
    /// Numeric id.
    pub id: i64,
    /// Key in authorized_keys format.
    pub key: String,
    /// Key fingerprint.
    pub fingerprint: String,
    /// Trailing comment of the key, if any.
    #[serde(default)]
    pub comment: Option<String>,
    /// When the key was authorized.
    pub created: DateTime<Utc>,
    /// When the key was last used.
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    /// Owner.
    #[serde(default)]
    pub user: Option<UserRef>,
}

/// A PGP public key registered with meta.sr.ht.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgpKey {
    /// Numeric id.
    pub id: i64,
    /// Armored key material.
    pub key: String,
    /// Key fingerprint.
    pub fingerprint: String,
    /// When the key was authorized.
    pub created: DateTime<Utc>,
    /// Owner.
    #[serde(default)]
    pub user: Option<UserRef>,
}

/// Check an SSH key looks like `<type> <base64> [comment]`.
pub fn validate_ssh_key(key: &str) -> Result<()> {
    let mut parts = key.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(kind), Some(_)) if kind.starts_with("ssh-") || kind.starts_with("ecdsa-") || kind.starts_with("sk-") => Ok(()),
        (Some(_), Some(_)) => Err(Error::invalid("key", "unrecognized SSH key type")),
        _ => Err(Error::invalid(
            "key",
            "expected '<type> <base64> [comment]' in authorized_keys format",
        )),
    }
}

/// Check a PGP key is ASCII-armored.
pub fn validate_pgp_key(key: &str) -> Result<()> {
    if key.trim_start().starts_with("-----BEGIN PGP PUBLIC KEY BLOCK-----") {
        Ok(())
    } else {
        Err(Error::invalid("key", "expected an ASCII-armored PGP public key"))
    }
}

// =============================================================================
// Pastes
// =============================================================================

/// A paste on paste.sr.ht.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    /// Paste id (a SHA-1 hex string).
    pub id: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Visibility.
    pub visibility: Visibility,
    /// Owner.
    #[serde(default)]
    pub user: Option<UserRef>,
    /// Files, in order.
    #[serde(default)]
    pub files: Vec<File>,
}

impl Paste {
    /// Find a file by content hash.
    #[must_use]
    pub fn file(&self, hash: &str) -> Option<&File> {
        self.files.iter().find(|f| f.hash == hash)
    }
}

/// One file within a paste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// File name, if one was given.
    #[serde(default)]
    pub filename: Option<String>,
    /// Content hash.
    pub hash: String,
    /// Contents; only populated when fetched by hash.
    #[serde(default)]
    pub contents: Option<String>,
}
