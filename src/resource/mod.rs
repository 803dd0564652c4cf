//! sourcehut resource types for the declarative engine
//!
//! Each resource type maps flat manifest attributes onto the typed
//! operations of [`srht::Client`]:
//! - State detection (`read`, with `NotFound` meaning gone)
//! - Create, update and delete
//! - Import of objects created outside this tool

mod pgp_key;
mod repository;
mod ssh_key;

pub use pgp_key::PgpKeyType;
pub use repository::RepositoryType;
pub use ssh_key::SshKeyType;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::{Attributes, Provider, ResourceData};
use serde_json::Value;
use srht::{Client, RequestContext, UserRef};
use std::sync::Arc;
use std::time::Duration;

pub const REPOSITORY: &str = "sourcehut_repository";
pub const SSH_KEY: &str = "sourcehut_user_ssh_key";
pub const PGP_KEY: &str = "sourcehut_user_pgp_key";

/// Shared handle to the sourcehut client plus the per-call timeout
#[derive(Clone)]
pub struct Api {
    client: Arc<Client>,
    timeout: Duration,
}

impl Api {
    pub fn new(client: Arc<Client>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fresh context for one lifecycle call
    pub fn ctx(&self) -> RequestContext {
        RequestContext::with_timeout(self.timeout)
    }

    /// The entity's owner, or the authenticated user when the API omitted it
    fn owner(&self, ctx: &RequestContext, owner: Option<&UserRef>) -> Result<UserRef> {
        match owner {
            Some(owner) => Ok(owner.clone()),
            None => {
                log::debug!("Owner missing from response, asking for the current user");
                Ok(self.client.get_current_user(ctx)?.to_user_ref())
            }
        }
    }
}

/// Provider with every sourcehut resource type registered
pub fn provider(api: &Api) -> Provider {
    Provider::new()
        .with(RepositoryType::new(api.clone()))
        .with(SshKeyType::new(api.clone()))
        .with(PgpKeyType::new(api.clone()))
}

// ============================================================================
// Attribute helpers
// ============================================================================

/// Set `key` (RFC 3339) and `key_unix` (seconds); both removed when `None`
fn set_time(data: &mut ResourceData, key: &str, time: Option<DateTime<Utc>>) {
    data.set(key, time.map(|t| t.to_rfc3339()));
    data.set(&format!("{key}_unix"), time.map(|t| t.timestamp()));
}

fn set_owner(data: &mut ResourceData, owner: &UserRef) {
    data.set("user", owner.username.as_str());
    data.set("canonical_user", owner.canonical_name.as_str());
}

/// Reject attributes the resource type does not accept in configuration
fn check_keys(resource_type: &str, config: &Attributes, allowed: &[&str]) -> Result<()> {
    if let Some(key) = config.keys().find(|k| !allowed.contains(&k.as_str())) {
        bail!(
            "{resource_type} does not accept attribute '{key}' (allowed: {})",
            allowed.join(", ")
        );
    }
    Ok(())
}

fn optional_str<'a>(config: &'a Attributes, key: &str) -> Result<Option<&'a str>> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => bail!("'{key}' must be a string, got {other}"),
    }
}

fn required_str<'a>(config: &'a Attributes, key: &str) -> Result<&'a str> {
    optional_str(config, key)?.with_context(|| format!("'{key}' is required"))
}

/// Numeric remote id recorded as the resource id
fn numeric_id(data: &ResourceData) -> Result<i64> {
    data.id
        .parse()
        .with_context(|| format!("Invalid {} id '{}': expected a number", data.resource_type, data.id))
}

/// Keys compare equal when only whitespace differs
fn same_key(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}

/// `same_value` for key resources: `key` ignores whitespace differences
fn same_key_value(key: &str, recorded: &Value, declared: &Value) -> bool {
    match (key, recorded, declared) {
        ("key", Value::String(recorded), Value::String(declared)) => same_key(recorded, declared),
        _ => recorded == declared,
    }
}

/// The recorded key text when the server returned an equivalent one
///
/// Servers normalize whitespace; keeping the declared text avoids a
/// spurious replacement on every plan.
fn preserve_key(recorded: Option<&str>, remote: &str) -> String {
    match recorded {
        Some(recorded) if same_key(recorded, remote) => recorded.to_string(),
        _ => remote.to_string(),
    }
}

/// Map a lookup result onto `read` semantics: `NotFound` is absence
fn found<T>(result: srht::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind().clears_state() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Map a delete result: an already-missing object is success
fn deleted(what: &str, result: srht::Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            log::info!("{what} already deleted");
            Ok(())
        }
        other => other.map_err(Into::into),
    }
}

// ============================================================================
// Test helpers
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_set_time() {
        let mut data = ResourceData::new(REPOSITORY, "1");
        let time = Utc.with_ymd_and_hms(2025, 10, 28, 12, 0, 0).unwrap();

        set_time(&mut data, "created", Some(time));
        assert_eq!(data.get_str("created"), Some("2025-10-28T12:00:00+00:00"));
        assert_eq!(data.get_i64("created_unix"), Some(time.timestamp()));

        set_time(&mut data, "created", None);
        assert!(data.attributes.is_empty());
    }

    #[test]
    fn test_check_keys() {
        let mut config = Attributes::new();
        config.insert("name".into(), Value::from("x"));
        assert!(check_keys(REPOSITORY, &config, &["name"]).is_ok());

        config.insert("colour".into(), Value::from("red"));
        let err = check_keys(REPOSITORY, &config, &["name"]).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_string_attributes() {
        let mut config = Attributes::new();
        config.insert("name".into(), Value::from(3));
        assert!(required_str(&config, "name").is_err());
        assert!(required_str(&config, "missing").is_err());
        assert_eq!(optional_str(&config, "missing").unwrap(), None);
    }

    #[test]
    fn test_preserve_key_ignores_whitespace() {
        assert_eq!(preserve_key(Some("ssh-ed25519 AAA c\n"), "ssh-ed25519 AAA c"), "ssh-ed25519 AAA c\n");
        assert_eq!(preserve_key(Some("ssh-ed25519 AAA"), "ssh-ed25519 BBB"), "ssh-ed25519 BBB");
        assert_eq!(preserve_key(None, "ssh-ed25519 AAA"), "ssh-ed25519 AAA");
    }

    #[test]
    fn test_same_key_value() {
        let declared = Value::from("ssh-ed25519 AAA c\n");
        assert!(same_key_value("key", &Value::from("ssh-ed25519 AAA c"), &declared));
        assert!(!same_key_value("key", &Value::from("ssh-ed25519 BBB c"), &declared));
        assert!(!same_key_value("comment", &Value::from("c"), &Value::from("c ")));
    }

    #[test]
    fn test_unrepresentable_timeout_does_not_panic() {
        let mock = srht::MockTransport::always("{}");
        let client = Client::with_transport("test-token", srht::Endpoints::new(), Arc::new(mock))
            .unwrap();
        let api = Api::new(Arc::new(client), Duration::from_secs(u64::MAX));
        assert!(api.ctx().check().is_ok());
    }

    #[test]
    fn test_found_and_deleted_mapping() {
        assert_eq!(found::<i32>(Err(srht::Error::not_found("x"))).unwrap(), None);
        assert!(found::<i32>(Err(srht::Error::Timeout)).is_err());
        assert!(deleted("x", Err(srht::Error::not_found("x"))).is_ok());
        assert!(deleted("x", Err(srht::Error::MissingToken)).is_err());
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id(&ResourceData::new(SSH_KEY, "12")).unwrap(), 12);
        assert!(numeric_id(&ResourceData::new(SSH_KEY, "dotfiles")).is_err());
    }
}
