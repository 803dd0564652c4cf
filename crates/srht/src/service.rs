//! Logical sourcehut services and their endpoints.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A sourcehut backend service, each with its own GraphQL endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    /// git.sr.ht: repositories.
    Git,
    /// meta.sr.ht: user profile, SSH and PGP keys.
    Meta,
    /// paste.sr.ht: pastes and their files.
    Paste,
}

impl Service {
    /// All known services.
    #[must_use]
    pub fn all() -> &'static [Service] {
        &[Service::Git, Service::Meta, Service::Paste]
    }

    /// Stable short key (e.g. "git").
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Service::Git => "git",
            Service::Meta => "meta",
            Service::Paste => "paste",
        }
    }

    /// Public hostname on sr.ht.
    #[must_use]
    pub fn host(&self) -> &'static str {
        match self {
            Service::Git => "git.sr.ht",
            Service::Meta => "meta.sr.ht",
            Service::Paste => "paste.sr.ht",
        }
    }

    /// Default GraphQL endpoint on sr.ht.
    #[must_use]
    pub fn default_url(&self) -> String {
        format!("https://{}/query", self.host())
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Service {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Service::all()
            .iter()
            .copied()
            .find(|service| service.key() == s || service.host() == s)
            .ok_or_else(|| Error::invalid("service", format!("unknown service '{s}'")))
    }
}

/// Endpoint URLs per service.
///
/// Defaults to the public sr.ht instance; self-hosted installations
/// override individual services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    overrides: HashMap<Service, String>,
}

impl Endpoints {
    /// Endpoints of the public sr.ht instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `service` at `url` instead of its default.
    pub fn with(mut self, service: Service, url: impl Into<String>) -> Self {
        self.set(service, url);
        self
    }

    /// Point `service` at `url` instead of its default.
    pub fn set(&mut self, service: Service, url: impl Into<String>) {
        self.overrides
            .insert(service, url.into().trim_end_matches('/').to_string());
    }

    /// The URL requests for `service` are sent to.
    #[must_use]
    pub fn url(&self, service: Service) -> String {
        self.overrides
            .get(&service)
            .cloned()
            .unwrap_or_else(|| service.default_url())
    }
}
