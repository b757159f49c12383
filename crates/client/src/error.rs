//! Errors surfaced by the vendor API client.
//!
//! Every failure maps onto one of four kinds the view layer handles
//! differently: inline field errors, a toast with the server's message, a
//! forced logout, or a retry affordance. See [`FailureKind`].

use core::fmt;

use thiserror::Error;

/// How the view layer should present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Client-side field validation; the request never left the process.
    Validation,
    /// The server answered with a non-2xx, non-auth status.
    Rejection,
    /// The server answered 401 or 403; session teardown is already under way.
    AuthFailure,
    /// The server could not be reached or did not answer in time.
    Transport,
}

/// Transport-level failure detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// The per-request timeout elapsed.
    Timeout,
    /// Connection could not be established.
    Connect,
    /// Anything else below HTTP (TLS, body stream, redirect loop).
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Connect => f.write_str("connect"),
            Self::Other => f.write_str("transport"),
        }
    }
}

/// Errors that can occur when talking to the vendor API.
///
/// `Clone` so that one fetch result can be handed to every caller waiting on
/// the same in-flight request.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Request input failed field validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Server answered with a non-success status.
    #[error("{}", rejection_message(.message.as_deref(), .fallback))]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message supplied by the server, if any.
        message: Option<String>,
        /// Operation-specific message used when the server gave none.
        fallback: String,
    },

    /// Request never produced an HTTP response.
    #[error("Network error ({kind}): {message}")]
    Transport {
        /// What went wrong below HTTP.
        kind: TransportKind,
        /// Underlying error text.
        message: String,
    },

    /// Response body did not match any known shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Request could not be built (bad path, unreadable attachment).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

fn rejection_message(message: Option<&str>, fallback: &str) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => fallback.to_string(),
    }
}

impl ApiError {
    /// Build a rejection with the generic fallback for its status.
    #[must_use]
    pub fn rejected(status: u16, message: Option<String>) -> Self {
        Self::Rejected {
            status,
            message,
            fallback: format!("Request failed with status {status}"),
        }
    }

    /// Replace the generic fallback of a rejection with an operation-specific one.
    ///
    /// A message supplied by the server always wins over the fallback.
    #[must_use]
    pub fn with_fallback(self, fallback: &str) -> Self {
        match self {
            Self::Rejected {
                status, message, ..
            } => Self::Rejected {
                status,
                message,
                fallback: fallback.to_string(),
            },
            other => other,
        }
    }

    /// Classify this failure for presentation.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::Rejected {
                status: 401 | 403, ..
            } => FailureKind::AuthFailure,
            Self::Rejected { .. } | Self::Decode(_) | Self::InvalidRequest(_) => {
                FailureKind::Rejection
            }
            Self::Transport { .. } => FailureKind::Transport,
        }
    }

    /// HTTP status, when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status: 404, .. })
    }

    /// Whether retrying the same request could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if err.is_builder() {
            return Self::InvalidRequest(err.to_string());
        }
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else {
            TransportKind::Other
        };
        Self::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
