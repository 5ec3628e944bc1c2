//! Request URL assembly and GET/POST selection.
//!
//! [`RequestDispatcher`] is the only component that talks to the
//! [`Transport`]. It decides the HTTP method from the presence of a form
//! body and, for GETs, moves any query component of the URL into the
//! transport's parameter set.
//!
//! Query normalization follows form-decoding rules: the first value of a
//! repeated key wins and later duplicates are dropped, keys keep the order of
//! their first appearance, and pairs with a blank value are skipped.

use bytes::Bytes;

use crate::error::{GraphError, Result};
use crate::transport::Transport;

/// Message carried by the authentication error raised for token-less calls.
const NOT_AUTHENTICATED: &str =
    "must be authenticated: obtain an access token before calling the Graph API";

/// Sends requests through a [`Transport`] against a fixed Graph API base.
///
/// Design rationale:
/// - GET URLs are assembled as strings (token appended, extra parameters
///   concatenated) and then re-parsed into a parameter list. Callers can hand
///   over paging URLs and pre-encoded parameters unchanged, and the transport
///   still receives one normalized set in which extra parameters appended
///   after the token can never override it.
/// - POST URLs are sent untouched: the form body carries the payload and the
///   token stays in the query where the API expects it.
/// - The transport is boxed so tests and callers can swap it without the
///   dispatcher becoming generic over it.
pub struct RequestDispatcher {
    transport: Box<dyn Transport>,
    graph_base: String,
}

impl RequestDispatcher {
    /// Creates a dispatcher that resolves authenticated paths against
    /// `graph_base`.
    pub fn new(transport: Box<dyn Transport>, graph_base: impl Into<String>) -> Self {
        RequestDispatcher {
            transport,
            graph_base: graph_base.into(),
        }
    }

    /// Sends a request and returns the raw payload.
    ///
    /// With no (or an empty) `body` this is a GET whose query component is
    /// re-parsed and sent as the parameter set. With a non-empty `body` it is
    /// a POST of `body` as a form to `url` exactly as given.
    ///
    /// # Errors
    ///
    /// - `GraphError::Transport`: the collaborator failed; passed through.
    pub fn make_request(&self, url: &str, body: Option<&[(String, String)]>) -> Result<Bytes> {
        let response = match body {
            Some(form) if !form.is_empty() => {
                tracing::debug!(
                    method = "POST",
                    endpoint = strip_query(url),
                    fields = form.len(),
                    "dispatching request"
                );
                self.transport.post(url, form)?
            }
            _ => {
                let (endpoint, params) = normalize_query(url);
                tracing::debug!(
                    method = "GET",
                    endpoint,
                    params = params.len(),
                    "dispatching request"
                );
                self.transport.get(endpoint, &params)?
            }
        };
        tracing::debug!(
            status = response.status,
            bytes = response.body.len(),
            "received response"
        );
        Ok(response.body)
    }

    /// Sends a request to `{graph_base}{path}` carrying the access token.
    ///
    /// `access_token=<token>` is appended with `?` when `path` has no query
    /// component and `&` otherwise; `extra_params` (already encoded) follows
    /// with `&`.
    ///
    /// # Errors
    ///
    /// - `GraphError::Authentication`: `access_token` is `None`.
    /// - `GraphError::Transport`: the collaborator failed.
    pub fn make_authenticated_request(
        &self,
        access_token: Option<&str>,
        path: &str,
        extra_params: Option<&str>,
        body: Option<&[(String, String)]>,
    ) -> Result<Bytes> {
        let token = access_token.ok_or_else(|| GraphError::authentication(NOT_AUTHENTICATED))?;

        let sep = if path.contains('?') { '&' } else { '?' };
        let mut url = format!("{}{path}{sep}access_token={token}", self.graph_base);
        if let Some(extra) = extra_params.filter(|extra| !extra.is_empty()) {
            url.push('&');
            url.push_str(extra);
        }

        self.make_request(&url, body)
    }

    /// GETs an absolute paging URL returned by the API.
    ///
    /// Paging URLs normally embed the token already; when they don't, the
    /// current one is added.
    ///
    /// # Errors
    ///
    /// - `GraphError::Authentication`: `access_token` is `None`.
    /// - `GraphError::Transport`: the collaborator failed.
    pub fn follow_paging_url(&self, access_token: Option<&str>, url: &str) -> Result<Bytes> {
        let token = access_token.ok_or_else(|| GraphError::authentication(NOT_AUTHENTICATED))?;

        let (_, params) = normalize_query(url);
        if params.iter().any(|(key, _)| key == "access_token") {
            return self.make_request(url, None);
        }
        let sep = if url.contains('?') { '&' } else { '?' };
        self.make_request(&format!("{url}{sep}access_token={token}"), None)
    }
}

/// Splits `url` at the first `?` and decodes the query into a first-wins
/// parameter list.
pub(crate) fn normalize_query(url: &str) -> (&str, Vec<(String, String)>) {
    let Some((endpoint, query)) = url.split_once('?') else {
        return (url, Vec::new());
    };

    let mut params: Vec<(String, String)> = Vec::new();
    for (key, value) in decode_pairs(query) {
        if value.is_empty() || params.iter().any(|(seen, _)| *seen == key) {
            continue;
        }
        params.push((key, value));
    }
    (endpoint, params)
}

/// Form-decodes `query` into its pairs, in order.
///
/// Decoding into string pairs cannot fail: stray `%` sequences are kept
/// verbatim and invalid UTF-8 is replaced lossily, so every query string
/// maps to some pair list. The fallback is unreachable.
pub(crate) fn decode_pairs(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(query).unwrap_or_default()
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(endpoint, _)| endpoint)
}
