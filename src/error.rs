//! Typed error hierarchy for the fbgraph crate.
//!
//! Every failure surfaced by the library is a [`GraphError`]. Variants map to
//! the boundary where the failure was detected:
//! - `Authentication` covers the token lifecycle: calling an authenticated
//!   endpoint without a token, or a token exchange whose response carries no
//!   `access_token`.
//! - `Api` covers payloads wrapped in the Graph API `{"error": {...}}`
//!   envelope. The API-supplied message is kept verbatim.
//! - `QuerySyntax` covers query strings the table resolver cannot read.
//! - `Transport` wraps whatever the HTTP collaborator failed with. It is
//!   never retried or rewritten.
//!
//! Errors are raised at the point of detection and are not logged or
//! swallowed on the way back to the caller.

/// Unified error type for all fbgraph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// An authenticated call was attempted without an access token, or a
    /// token exchange response did not contain one.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Human-readable reason. For failed exchanges this is the
        /// `error.message` returned by the token endpoint.
        message: String,
    },

    /// The API answered with an `error` wrapper instead of the requested
    /// object or list.
    #[error("API error: {message}")]
    Api {
        /// The `error.message` field, verbatim.
        message: String,
        /// The numeric `error.code`, when the API sent one.
        code: Option<i64>,
        /// The `error.type` field (e.g. `"OAuthException"`), when present.
        error_type: Option<String>,
    },

    /// The resolver could not find `FROM` or the token following it.
    #[error("invalid query syntax: {query}")]
    QuerySyntax {
        /// The query that failed to resolve.
        query: String,
    },

    /// The HTTP collaborator failed (DNS, TCP, TLS, timeout, ...).
    #[error("network error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A payload that must be JSON could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request parameters could not be form-encoded.
    #[error("failed to encode request parameters: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    /// The payload was valid JSON but not of a shape the operation reads.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        GraphError::Transport(Box::new(err))
    }
}

impl GraphError {
    pub(crate) fn authentication(message: impl Into<String>) -> Self {
        GraphError::Authentication {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, GraphError>;
