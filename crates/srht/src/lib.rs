//! # srht
//!
//! Blocking client for the sourcehut GraphQL APIs.
//!
//! This crate provides:
//! - A bearer-token [`transport`] decorator over a pluggable HTTP transport
//! - A [`router`] that lazily builds one GraphQL client per service
//!   (git.sr.ht, meta.sr.ht, paste.sr.ht) and shares it between callers
//! - Typed entity operations for repositories, SSH keys, PGP keys, the user
//!   profile and pastes
//! - A single [`error`] classification every caller can branch on
//!
//! ## Example
//!
//! ```no_run
//! use srht::{Client, RepositoryInput, RequestContext, Visibility};
//! use std::time::Duration;
//!
//! let client = Client::new("my-token").expect("token required");
//! let ctx = RequestContext::with_timeout(Duration::from_secs(30));
//!
//! let repo = client
//!     .create_repository(&ctx, &RepositoryInput::new("dotfiles").visibility(Visibility::Private))
//!     .expect("create failed");
//! println!("Created {} ({})", repo.name, repo.id);
//!
//! match client.get_repository(&ctx, "does-not-exist") {
//!     Err(e) if e.is_not_found() => println!("gone"),
//!     other => println!("{other:?}"),
//! }
//! ```
//!
//! ## Testing
//!
//! Pass a [`MockTransport`] to [`Client::with_transport`] to answer
//! requests without touching the network.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod graphql;
mod ops;
pub mod router;
pub mod service;
pub mod transport;
pub mod types;

pub use context::{CancelToken, RequestContext};
pub use error::{Error, ErrorKind, Result};
pub use router::ServiceRouter;
pub use service::{Endpoints, Service};
pub use transport::{BearerAuth, Credential, MockTransport, Transport, UreqTransport};
pub use types::{
    File, Paste, PgpKey, PgpKeySummary, Repository, RepositoryInput, SshKey, User, UserRef,
    Visibility,
};

use std::sync::Arc;

/// High-level client for sourcehut.
///
/// Owns one [`ServiceRouter`]; every operation goes through it, so clients
/// for each service are built at most once per `Client`. `Client` is
/// `Send + Sync` and meant to be shared.
pub struct Client {
    router: ServiceRouter,
}

impl Client {
    /// Create a client for the public sr.ht instance.
    ///
    /// # Errors
    ///
    /// `MissingToken` if `token` is empty.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_endpoints(token, Endpoints::new())
    }

    /// Create a client with custom service endpoints.
    pub fn with_endpoints(token: impl Into<String>, endpoints: Endpoints) -> Result<Self> {
        Ok(Self::from_router(ServiceRouter::new(
            Credential::new(token)?,
            endpoints,
        )))
    }

    /// Create a client over a custom transport (useful for testing).
    pub fn with_transport(
        token: impl Into<String>,
        endpoints: Endpoints,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        Ok(Self::from_router(ServiceRouter::with_transport(
            Credential::new(token)?,
            endpoints,
            transport,
        )))
    }

    /// Create a client around an existing router.
    #[must_use]
    pub fn from_router(router: ServiceRouter) -> Self {
        Self { router }
    }

    /// The router this client sends requests through.
    #[must_use]
    pub fn router(&self) -> &ServiceRouter {
        &self.router
    }
}
