//! Per-service client cache.

use crate::graphql::GraphQlClient;
use crate::service::{Endpoints, Service};
use crate::transport::{BearerAuth, Credential, Transport, UreqTransport};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Hands out one [`GraphQlClient`] per service, built on first use.
///
/// All clients share a single authenticated transport. The check-and-create
/// runs under a lock, so concurrent callers asking for the same service
/// always get the same client.
pub struct ServiceRouter {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    clients: Mutex<HashMap<Service, Arc<GraphQlClient>>>,
}

impl ServiceRouter {
    /// Create a router using the default HTTP transport.
    #[must_use]
    pub fn new(credential: Credential, endpoints: Endpoints) -> Self {
        Self::with_transport(credential, endpoints, Arc::new(UreqTransport::new()))
    }

    /// Create a router over a custom transport (useful for testing).
    ///
    /// `inner` is wrapped in [`BearerAuth`]; it should not add credentials
    /// itself.
    pub fn with_transport(
        credential: Credential,
        endpoints: Endpoints,
        inner: Arc<dyn Transport>,
    ) -> Self {
        Self {
            transport: Arc::new(BearerAuth::new(credential, inner)),
            endpoints,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// The configured endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Get the client for `service`, creating it if needed.
    pub fn client(&self, service: Service) -> Arc<GraphQlClient> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let client = clients.entry(service).or_insert_with(|| {
            let url = self.endpoints.url(service);
            log::debug!("Creating {service} client for {url}");
            Arc::new(GraphQlClient::new(url, Arc::clone(&self.transport)))
        });
        Arc::clone(client)
    }

    /// Client for git.sr.ht.
    pub fn git(&self) -> Arc<GraphQlClient> {
        self.client(Service::Git)
    }

    /// Client for meta.sr.ht.
    pub fn meta(&self) -> Arc<GraphQlClient> {
        self.client(Service::Meta)
    }

    /// Client for paste.sr.ht.
    pub fn paste(&self) -> Arc<GraphQlClient> {
        self.client(Service::Paste)
    }

    /// Number of clients built so far.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
