//! Minimal GraphQL-over-HTTP client.
//!
//! An [`Operation`] is a query document plus named variables.
//! [`GraphQlClient::execute`] posts it, then turns the HTTP status and
//! response envelope into either the decoded `data` or a classified
//! [`Error`]. This is the only place status codes and GraphQL error
//! messages are interpreted.

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// A named GraphQL query or mutation with its variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    name: String,
    query: String,
    variables: Map<String, Value>,
}

impl Operation {
    /// Create an operation. `name` must match the operation name in `query`.
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            variables: Map::new(),
        }
    }

    /// Bind a variable.
    pub fn var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    /// Bind a variable only when a value is present.
    pub fn var_opt(self, name: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.var(name, value),
            None => self,
        }
    }

    /// Operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound variables.
    #[must_use]
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// Serialize to the standard GraphQL-over-HTTP request body.
    #[must_use]
    pub fn to_body(&self) -> String {
        json!({
            "query": self.query,
            "operationName": self.name,
            "variables": self.variables,
        })
        .to_string()
    }
}

/// One page of a cursor-paginated list.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub results: Vec<T>,
    /// Cursor for the next page; `None` on the last page.
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Protocol client bound to one service endpoint.
pub struct GraphQlClient {
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl GraphQlClient {
    /// Create a client that posts to `endpoint` through `transport`.
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    /// The endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run `op` and decode its `data` into `T`.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled`/`Timeout` if `ctx` is already done, otherwise
    /// whatever the transport or [`classify`] produces.
    pub fn execute<T: DeserializeOwned>(&self, ctx: &RequestContext, op: &Operation) -> Result<T> {
        ctx.check()?;

        let mut request = HttpRequest::post_json(&self.endpoint, op.to_body());
        request.timeout = ctx.remaining();

        log::debug!("{} {} -> {}", op.name(), Value::Object(op.variables().clone()), self.endpoint);
        let response = self.transport.round_trip(request)?;
        log::trace!("{} responded {}: {}", op.name(), response.status, response.body);

        let data = classify(&response)?;
        serde_json::from_value(data)
            .map_err(|e| Error::InvalidResponse(format!("{}: {e}", op.name())))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Turn a raw response into the envelope's `data` or a classified error.
pub fn classify(response: &HttpResponse) -> Result<Value> {
    let status = response.status;
    match status {
        401 | 403 => {
            return Err(Error::Unauthorized {
                message: error_text(&response.body),
                status: Some(status),
            });
        }
        404 => return Err(Error::not_found(error_text(&response.body))),
        429 | 500..=599 => {
            return Err(Error::http(
                format!("HTTP {status}: {}", error_text(&response.body)),
                Some(status),
            ));
        }
        _ => {}
    }

    let envelope: Envelope = match serde_json::from_str(&response.body) {
        Ok(envelope) => envelope,
        Err(_) if matches!(status, 400 | 422) => {
            return Err(Error::Rejected {
                message: response.body.trim().to_string(),
            });
        }
        Err(e) => {
            return Err(Error::InvalidResponse(format!(
                "HTTP {status}: body is not a GraphQL response: {e}"
            )));
        }
    };

    if let Some(first) = envelope.errors.first() {
        let message = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(classify_message(&first.message, message));
    }

    match envelope.data {
        Some(Value::Null) | None => Err(Error::InvalidResponse(format!(
            "HTTP {status}: response carried no data"
        ))),
        Some(data) => Ok(data),
    }
}

fn classify_message(first: &str, message: String) -> Error {
    let lower = first.to_ascii_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if mentions(&["not found", "no such", "does not exist"]) {
        Error::NotFound { what: message }
    } else if mentions(&[
        "unauthorized",
        "access denied",
        "forbidden",
        "invalid token",
        "authentication",
    ]) {
        Error::Unauthorized {
            message,
            status: None,
        }
    } else {
        Error::Rejected { message }
    }
}

/// Best-effort short message from an error body.
fn error_text(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<Envelope>(body)
        && let Some(first) = envelope.errors.first()
    {
        return first.message.clone();
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancelToken;
    use crate::error::ErrorKind;
    use crate::transport::MockTransport;
    use std::time::Duration;

    fn kind_of(status: u16, body: &str) -> ErrorKind {
        classify(&HttpResponse::new(status, body)).unwrap_err().kind()
    }

    #[test]
    fn test_operation_body() {
        let op = Operation::new("GetRepo", "query GetRepo($name: String!) { me { id } }")
            .var("name", "dotfiles")
            .var_opt("description", None::<String>);
        let body: Value = serde_json::from_str(&op.to_body()).unwrap();

        assert_eq!(body["operationName"], "GetRepo");
        assert_eq!(body["variables"]["name"], "dotfiles");
        assert!(body["variables"].get("description").is_none());
        assert!(body["query"].as_str().unwrap().contains("GetRepo"));
    }

    #[test]
    fn test_classify_success() {
        let data = classify(&HttpResponse::ok(r#"{"data":{"me":{"id":1}}}"#)).unwrap();
        assert_eq!(data["me"]["id"], 1);
    }

    #[test]
    fn test_classify_status_codes() {
        assert_eq!(kind_of(401, ""), ErrorKind::Auth);
        assert_eq!(kind_of(403, "denied"), ErrorKind::Auth);
        assert_eq!(kind_of(404, "Not Found"), ErrorKind::NotFound);
        assert_eq!(kind_of(429, "slow down"), ErrorKind::Transport);
        assert_eq!(kind_of(502, "<html>bad gateway</html>"), ErrorKind::Transport);
        assert_eq!(kind_of(400, "bad request"), ErrorKind::Validation);
        assert_eq!(kind_of(200, "<html>"), ErrorKind::Protocol);
    }

    #[test]
    fn test_classify_graphql_errors() {
        let not_found = r#"{"data":null,"errors":[{"message":"No repository by that name not found"}]}"#;
        assert_eq!(kind_of(200, not_found), ErrorKind::NotFound);

        let auth = r#"{"errors":[{"message":"Authentication failed: invalid token"}]}"#;
        assert_eq!(kind_of(200, auth), ErrorKind::Auth);

        let dup = r#"{"errors":[{"message":"A repository with this name already exists."}]}"#;
        assert_eq!(kind_of(200, dup), ErrorKind::Validation);

        // GraphQL errors returned with a 400 still classify by message
        let bad_enum = r#"{"errors":[{"message":"Value \"SECRET\" is not a valid Visibility"}]}"#;
        assert_eq!(kind_of(400, bad_enum), ErrorKind::Validation);
    }

    #[test]
    fn test_classify_joins_messages() {
        let body = r#"{"errors":[{"message":"first"},{"message":"second"}]}"#;
        let err = classify(&HttpResponse::ok(body)).unwrap_err();
        assert!(err.to_string().contains("first; second"));
    }

    #[test]
    fn test_classify_missing_data() {
        assert_eq!(kind_of(200, r#"{"data":null}"#), ErrorKind::Protocol);
        assert_eq!(kind_of(200, "{}"), ErrorKind::Protocol);
    }

    #[test]
    fn test_execute_decodes_data() {
        #[derive(Deserialize)]
        struct Me {
            id: i64,
        }
        #[derive(Deserialize)]
        struct Resp {
            me: Me,
        }

        let mock = MockTransport::always(r#"{"data":{"me":{"id":7}}}"#);
        let client = GraphQlClient::new("https://meta.sr.ht/query", Arc::new(mock.clone()));
        let resp: Resp = client
            .execute(&RequestContext::background(), &Operation::new("Me", "query Me { me { id } }"))
            .unwrap();

        assert_eq!(resp.me.id, 7);
        let seen = mock.requests();
        assert_eq!(seen[0].url, "https://meta.sr.ht/query");
        assert!(seen[0].timeout.is_none());
    }

    #[test]
    fn test_execute_wrong_shape_is_protocol_error() {
        #[derive(Debug, Deserialize)]
        struct Resp {
            #[allow(dead_code)]
            me: i64,
        }

        let mock = MockTransport::always(r#"{"data":{"me":"not a number"}}"#);
        let client = GraphQlClient::new("https://meta.sr.ht/query", Arc::new(mock));
        let err = client
            .execute::<Resp>(&RequestContext::background(), &Operation::new("Me", "query Me { me }"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_execute_passes_deadline_to_transport() {
        let mock = MockTransport::always(r#"{"data":{}}"#);
        let client = GraphQlClient::new("https://git.sr.ht/query", Arc::new(mock.clone()));
        let ctx = RequestContext::with_timeout(Duration::from_secs(30));

        let _: Value = client.execute(&ctx, &Operation::new("Q", "query Q { version }")).unwrap();

        let timeout = mock.requests()[0].timeout.unwrap();
        assert!(timeout <= Duration::from_secs(30));
    }

    #[test]
    fn test_execute_cancelled_sends_nothing() {
        let mock = MockTransport::always(r#"{"data":{}}"#);
        let client = GraphQlClient::new("https://git.sr.ht/query", Arc::new(mock.clone()));
        let token = CancelToken::new();
        token.cancel();
        let ctx = RequestContext::background().with_cancel(token);

        let err = client
            .execute::<Value>(&ctx, &Operation::new("Q", "query Q { version }"))
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(mock.requests().is_empty());
    }
}
