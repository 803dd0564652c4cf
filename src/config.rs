//! Provider configuration
//!
//! The `[provider]` table of the manifest. Every field is optional and
//! falls back to an environment variable when unset or empty:
//!
//! | Field          | Environment      |
//! |----------------|------------------|
//! | `token`        | `SRHT_TOKEN`     |
//! | `git_url`      | `SRHT_GIT_URL`   |
//! | `meta_url`     | `SRHT_META_URL`  |
//! | `paste_url`    | `SRHT_PASTE_URL` |
//! | `timeout_secs` | `SRHT_TIMEOUT`   |

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use srht::{Client, Endpoints, Service};
use std::fmt;
use std::time::Duration;

use crate::paths;

pub const ENV_TOKEN: &str = "SRHT_TOKEN";
pub const ENV_GIT_URL: &str = "SRHT_GIT_URL";
pub const ENV_META_URL: &str = "SRHT_META_URL";
pub const ENV_PASTE_URL: &str = "SRHT_PASTE_URL";
pub const ENV_TIMEOUT: &str = "SRHT_TIMEOUT";

/// Per-call timeout when neither the manifest nor the environment sets one
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// `[provider]` table as written in the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub token: Option<String>,
    pub git_url: Option<String>,
    pub meta_url: Option<String>,
    pub paste_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved provider settings
pub struct Settings {
    pub token: String,
    pub endpoints: Endpoints,
    pub timeout: Duration,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("token", &"<redacted>")
            .field("endpoints", &self.endpoints)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Settings {
    /// Build the sourcehut client these settings describe
    pub fn client(&self) -> Result<Client> {
        Client::with_endpoints(self.token.clone(), self.endpoints.clone())
            .context("Failed to create sourcehut client")
    }
}

impl ProviderConfig {
    /// Resolve against the process environment
    pub fn resolve(&self) -> Result<Settings> {
        self.resolve_with(paths::env_var)
    }

    /// Resolve against `lookup`, which returns `None` for unset variables
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Settings> {
        let Some(token) = data_or_env(self.token.as_deref(), ENV_TOKEN, &lookup) else {
            bail!("No API token: set `token` in [provider] or export {ENV_TOKEN}");
        };

        let mut endpoints = Endpoints::new();
        for (service, value, key) in [
            (Service::Git, self.git_url.as_deref(), ENV_GIT_URL),
            (Service::Meta, self.meta_url.as_deref(), ENV_META_URL),
            (Service::Paste, self.paste_url.as_deref(), ENV_PASTE_URL),
        ] {
            if let Some(url) = data_or_env(value, key, &lookup) {
                log::debug!("Using {service} endpoint {url}");
                endpoints.set(service, url);
            }
        }

        let secs = match self.timeout_secs {
            Some(secs) => secs,
            None => match lookup(ENV_TIMEOUT) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{ENV_TIMEOUT} must be a number of seconds, got '{raw}'"))?,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };
        if secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }

        Ok(Settings {
            token,
            endpoints,
            timeout: Duration::from_secs(secs),
        })
    }
}

/// Configured value when non-empty, otherwise the environment variable
fn data_or_env(
    value: Option<&str>,
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_token_from_config() {
        let config = ProviderConfig {
            token: Some("from-config".into()),
            ..Default::default()
        };
        let settings = config.resolve_with(env(&[(ENV_TOKEN, "from-env")])).unwrap();
        assert_eq!(settings.token, "from-config");
    }

    #[test]
    fn test_empty_value_falls_back_to_env() {
        let config = ProviderConfig {
            token: Some(String::new()),
            ..Default::default()
        };
        let settings = config.resolve_with(env(&[(ENV_TOKEN, "from-env")])).unwrap();
        assert_eq!(settings.token, "from-env");
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let err = ProviderConfig::default().resolve_with(env(&[])).unwrap_err();
        assert!(err.to_string().contains(ENV_TOKEN));
    }

    #[test]
    fn test_endpoint_overrides() {
        let config = ProviderConfig {
            token: Some("t".into()),
            git_url: Some("https://git.example.org/query".into()),
            ..Default::default()
        };
        let settings = config
            .resolve_with(env(&[(ENV_META_URL, "https://meta.example.org/query")]))
            .unwrap();
        assert_eq!(settings.endpoints.url(Service::Git), "https://git.example.org/query");
        assert_eq!(settings.endpoints.url(Service::Meta), "https://meta.example.org/query");
        assert_eq!(settings.endpoints.url(Service::Paste), Service::Paste.default_url());
    }

    #[test]
    fn test_timeout_resolution() {
        let config = ProviderConfig {
            token: Some("t".into()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_with(env(&[])).unwrap().timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert_eq!(
            config.resolve_with(env(&[(ENV_TIMEOUT, "5")])).unwrap().timeout,
            Duration::from_secs(5)
        );
        assert!(config.resolve_with(env(&[(ENV_TIMEOUT, "soon")])).is_err());
        assert!(config.resolve_with(env(&[(ENV_TIMEOUT, "0")])).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig {
            token: Some("secret-token".into()),
            ..Default::default()
        };
        let settings = config.resolve_with(env(&[])).unwrap();
        assert!(!format!("{settings:?}").contains("secret-token"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(toml::from_str::<ProviderConfig>("tokn = \"x\"").is_err());
    }
}
