//! HTTP transports.
//!
//! [`Transport`] is the seam between the protocol client and the network.
//! [`UreqTransport`] is the real implementation, [`BearerAuth`] decorates
//! any transport with the API token, and [`MockTransport`] answers requests
//! from a closure so tests never touch the network.
//!
//! # Testing
//!
//! ```
//! use srht::transport::{HttpRequest, HttpResponse, MockTransport, Transport};
//!
//! let mock = MockTransport::new(|_req: &HttpRequest| Ok(HttpResponse::ok(r#"{"data":{}}"#)));
//! let resp = mock
//!     .round_trip(HttpRequest::post_json("https://meta.sr.ht/query", "{}"))
//!     .unwrap();
//! assert_eq!(resp.status, 200);
//! assert_eq!(mock.requests().len(), 1);
//! ```

use crate::error::{Error, Result};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("srht-rs/", env!("CARGO_PKG_VERSION"));

/// An outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: String,
    /// Upper bound for the whole exchange, if any.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Build a JSON POST request.
    pub fn post_json(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.into(),
            timeout: None,
        }
    }

    /// Set a header, replacing any existing value (case-insensitive name match).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Look up a header value (case-insensitive name match).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response. Non-2xx statuses are returned, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Create a response with the given status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Create a `200 OK` response.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }
}

/// Something that can carry an HTTP request to a server and back.
pub trait Transport: Send + Sync {
    /// Perform one request/response exchange.
    ///
    /// # Errors
    ///
    /// Connection, TLS and timeout failures. HTTP error statuses are
    /// returned as ordinary responses.
    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a transport with default agent settings.
    #[must_use]
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.agent.post(&request.url).header("User-Agent", USER_AGENT);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.config().timeout_global(Some(timeout)).build();
        }

        let mut response = builder.send(request.body.as_bytes())?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;

        Ok(HttpResponse { status, body })
    }
}

/// An API token.
///
/// Supplied once at startup and never rotated. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token, rejecting empty or blank strings.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::MissingToken);
        }
        Ok(Self(token))
    }

    /// The `Authorization` header value for this token.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Transport decorator that injects the bearer token into every request.
///
/// The response is passed through untouched and failures propagate as-is.
pub struct BearerAuth {
    credential: Credential,
    inner: Arc<dyn Transport>,
}

impl BearerAuth {
    /// Wrap `inner` so every request carries `credential`.
    pub fn new(credential: Credential, inner: Arc<dyn Transport>) -> Self {
        Self { credential, inner }
    }

    /// Wrap the default [`UreqTransport`].
    #[must_use]
    pub fn with_default_transport(credential: Credential) -> Self {
        Self::new(credential, Arc::new(UreqTransport::new()))
    }
}

impl Transport for BearerAuth {
    fn round_trip(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        request.set_header("Authorization", self.credential.bearer());
        self.inner.round_trip(request)
    }
}

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync;

/// Transport that answers from a closure and records every request.
#[derive(Clone)]
pub struct MockTransport {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Create a mock that answers every request with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that returns the same JSON body with `200 OK` every time.
    pub fn always(body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(move |_| Ok(HttpResponse::ok(body.clone())))
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.requests().len())
            .finish_non_exhaustive()
    }
}

impl Transport for MockTransport {
    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        (self.handler)(&request)
    }
}
