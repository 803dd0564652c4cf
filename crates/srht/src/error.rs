//! Error types for sourcehut API operations.
//!
//! Every failure is classified once, at the point where the raw transport
//! or protocol error is first observed, into one of the [`ErrorKind`]s.
//! Callers decide what to do from the kind alone and never inspect HTTP
//! status codes themselves.

use std::fmt;

/// Result type alias for sourcehut operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classified kinds of API failures.
///
/// The kind is what reconciliation code branches on: a `NotFound` means the
/// remote object is gone and local state can be cleared, every other kind
/// is a hard failure of the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The remote reports that the entity does not exist.
    NotFound,
    /// The credential was missing or rejected.
    Auth,
    /// Malformed or conflicting input (e.g. a duplicate repository name).
    Validation,
    /// Network or connectivity failure, including timeouts and cancellation.
    Transport,
    /// The response did not have the expected shape.
    Protocol,
}

impl ErrorKind {
    /// Whether this kind is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// Whether a caller may treat the target entity as absent.
    #[must_use]
    pub fn clears_state(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Get a user-friendly description of this error kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Resource not found",
            Self::Auth => "Authentication failed",
            Self::Validation => "Invalid input",
            Self::Transport => "Network connectivity issue",
            Self::Protocol => "Unexpected API response",
        }
    }

    /// Get actionable advice for resolving this error kind.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "The resource may have been deleted outside of this tool",
            Self::Auth => "Check that your personal access token is set and still valid",
            Self::Validation => "Fix the offending value in your configuration",
            Self::Transport => "Check your internet connection and try again",
            Self::Protocol => "The API may have changed; check for an update",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to sourcehut.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up (e.g. "repository 'dotfiles'").
        what: String,
    },

    /// No token was supplied.
    #[error("an API token is required")]
    MissingToken,

    /// The token was rejected by the server.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Server-provided message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Input rejected locally before any request was sent.
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        message: String,
    },

    /// Input rejected by the server.
    #[error("rejected by server: {message}")]
    Rejected {
        /// Server-provided message(s).
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// The request deadline passed.
    #[error("request timed out")]
    Timeout,

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// Invalid response from the API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a local validation error.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the classified kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::MissingToken | Error::Unauthorized { .. } => ErrorKind::Auth,
            Error::InvalidInput { .. } | Error::Rejected { .. } => ErrorKind::Validation,
            Error::Http { .. } | Error::Timeout | Error::Cancelled => ErrorKind::Transport,
            Error::InvalidResponse(_) => ErrorKind::Protocol,
        }
    }

    /// Shorthand for `self.kind() == ErrorKind::NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => Self::Timeout,
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
