//! OAuth authorization and token exchange against the Graph API.
//!
//! Two dialog flavors are supported:
//! - the authorization-code flow, where the dialog redirects back with a
//!   one-time `code` that [`TokenManager::exchange_code`] trades for a token
//!   through a server-side call;
//! - the implicit (`type=user_agent`) flow, where the dialog hands the token
//!   straight to the browser and no exchange happens.
//!
//! A short-lived token can then be traded for a long-lived one with
//! [`TokenManager::exchange_long_lived`].
//!
//! Token endpoint responses come in two formats: JSON (`{"access_token":
//! "...", "expires": 3600}`) and, on legacy API versions, an urlencoded
//! query string with the same keys. Parsing tries each format in order and
//! takes the first that succeeds. A parsed response without `access_token`
//! is a failure and becomes `GraphError::Authentication` carrying the
//! endpoint's `error.message`. Exchanges are never retried.
//!
//! The manager does not store anything; the caller
//! ([`GraphClient`](crate::client::GraphClient)) copies the returned
//! [`TokenExchange`] into its [`Credentials`]. Nothing is persisted.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{DEFAULT_REDIRECT_URI, Endpoints};
use crate::dispatch::{RequestDispatcher, decode_pairs};
use crate::error::{GraphError, Result};
use crate::object::ApiFailure;

/// Grant type for trading a short-lived token for a long-lived one.
const EXCHANGE_GRANT: &str = "fb_exchange_token";

/// Marker whose presence in a raw token payload signals success.
const ACCESS_TOKEN_KEY: &str = "access_token";

// ── Credentials ────────────────────────────────────────────────────────

/// The client's identity and current token. Lives as long as its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Application (client) ID.
    pub app_id: String,
    /// Current access token, if authenticated.
    pub access_token: Option<String>,
    /// Lifetime reported with the current token.
    pub expires_at: Option<Duration>,
    /// Requested permissions, in configured order.
    pub permissions: Vec<String>,
}

impl Credentials {
    /// Unauthenticated credentials for `app_id`.
    pub fn new(app_id: impl Into<String>, permissions: Vec<String>) -> Self {
        Credentials {
            app_id: app_id.into(),
            access_token: None,
            expires_at: None,
            permissions,
        }
    }

    /// The `scope` parameter: permissions joined with `,`.
    pub fn scope(&self) -> String {
        self.permissions.join(",")
    }

    /// Records a successful exchange.
    pub fn apply(&mut self, exchange: &TokenExchange) {
        self.access_token = Some(exchange.access_token.clone());
        self.expires_at = exchange.expires_at;
    }
}

/// Result of a successful token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenExchange {
    /// The issued token.
    pub access_token: String,
    /// Lifetime reported by the endpoint, if any.
    pub expires_at: Option<Duration>,
}

/// Which OAuth dialog variant to build a URL for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlavor {
    /// Authorization-code flow; the dialog returns a `code`.
    Code,
    /// Implicit (`user_agent`) flow; the dialog returns a token.
    Implicit,
}

// ── Request parameters ─────────────────────────────────────────────────

/// Query parameters of the OAuth dialog. Field order is the order they
/// appear in the URL.
#[derive(Serialize)]
struct AuthorizationRequest<'a> {
    client_id: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    scope: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
struct CodeExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct LongLivedExchangeRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    fb_exchange_token: &'a str,
}

// ── Token manager ──────────────────────────────────────────────────────

/// Drives the authorization flows for one set of [`Credentials`].
pub struct TokenManager<'a> {
    credentials: &'a Credentials,
    endpoints: &'a Endpoints,
    dispatcher: &'a RequestDispatcher,
}

impl<'a> TokenManager<'a> {
    /// A manager issuing token requests through `dispatcher`.
    pub fn new(
        credentials: &'a Credentials,
        endpoints: &'a Endpoints,
        dispatcher: &'a RequestDispatcher,
    ) -> Self {
        TokenManager {
            credentials,
            endpoints,
            dispatcher,
        }
    }

    /// Builds the OAuth dialog URL. No network call.
    ///
    /// `redirect_uri` defaults to [`DEFAULT_REDIRECT_URI`]. `state` is only
    /// sent with [`AuthFlavor::Code`]; the implicit flavor sends
    /// `type=user_agent` instead.
    ///
    /// # Errors
    ///
    /// - `GraphError::Encode`: parameters could not be encoded.
    pub fn authorization_url(
        &self,
        flavor: AuthFlavor,
        redirect_uri: Option<&str>,
        state: Option<&str>,
    ) -> Result<String> {
        let scope = self.credentials.scope();
        let (kind, state) = match flavor {
            AuthFlavor::Code => (None, state),
            AuthFlavor::Implicit => (Some("user_agent"), None),
        };
        let request = AuthorizationRequest {
            client_id: &self.credentials.app_id,
            kind,
            scope: &scope,
            state,
            redirect_uri: redirect_uri.unwrap_or(DEFAULT_REDIRECT_URI),
        };
        let query = serde_urlencoded::to_string(&request)?;
        Ok(format!("{}{query}", self.endpoints.auth_dialog_url()))
    }

    /// Trades an authorization `code` for an access token.
    ///
    /// # Errors
    ///
    /// - `GraphError::Authentication`: the response has no `access_token`;
    ///   the message is the endpoint's `error.message`.
    /// - `GraphError::Transport`: the request itself failed.
    pub fn exchange_code(
        &self,
        app_secret: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<TokenExchange> {
        let request = CodeExchangeRequest {
            client_id: &self.credentials.app_id,
            client_secret: app_secret,
            redirect_uri: redirect_uri.unwrap_or(DEFAULT_REDIRECT_URI),
            code,
        };
        let url = format!(
            "{}{}",
            self.endpoints.token_url(),
            serde_urlencoded::to_string(&request)?
        );

        tracing::debug!(grant = "authorization_code", "exchanging token");
        let payload = self.dispatcher.make_request(&url, None)?;
        finish_exchange(parse_token_payload(&payload))
    }

    /// Trades a short-lived token for a long-lived one.
    ///
    /// Success is first detected on the raw payload: when it does not even
    /// contain the text `access_token`, the exchange fails before any
    /// structured parse. Otherwise the payload is parsed like
    /// [`exchange_code`](Self::exchange_code) and the same presence check
    /// applies.
    ///
    /// # Errors
    ///
    /// - `GraphError::Authentication`: no token in the response.
    /// - `GraphError::Transport`: the request itself failed.
    pub fn exchange_long_lived(
        &self,
        app_secret: &str,
        short_lived_token: &str,
    ) -> Result<TokenExchange> {
        let request = LongLivedExchangeRequest {
            grant_type: EXCHANGE_GRANT,
            client_id: &self.credentials.app_id,
            client_secret: app_secret,
            fb_exchange_token: short_lived_token,
        };
        let url = format!(
            "{}{}",
            self.endpoints.token_url(),
            serde_urlencoded::to_string(&request)?
        );

        tracing::debug!(grant = EXCHANGE_GRANT, "exchanging token");
        let payload = self.dispatcher.make_request(&url, None)?;

        if !contains(&payload, ACCESS_TOKEN_KEY.as_bytes()) {
            let failure = ApiFailure::from_value(&parse_token_payload(&payload));
            return Err(authentication_failure(failure));
        }
        finish_exchange(parse_token_payload(&payload))
    }
}

// ── Response parsing ───────────────────────────────────────────────────

/// Parse attempts for token payloads, in order of preference.
const TOKEN_PARSERS: [fn(&[u8]) -> Option<Value>; 2] = [parse_json, parse_query_string];

/// Runs the parser chain; a payload no parser accepts yields an empty object.
fn parse_token_payload(payload: &[u8]) -> Value {
    TOKEN_PARSERS
        .iter()
        .find_map(|parse| parse(payload))
        .unwrap_or_else(|| Value::Object(Map::new()))
}

fn parse_json(payload: &[u8]) -> Option<Value> {
    serde_json::from_slice(payload).ok()
}

/// Legacy format: `access_token=...&expires=...`. Blank values are dropped
/// and the last value of a repeated key wins.
fn parse_query_string(payload: &[u8]) -> Option<Value> {
    let text = std::str::from_utf8(payload).ok()?;
    let fields: Map<String, Value> = decode_pairs(text.trim())
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    Some(Value::Object(fields))
}

/// The explicit success/failure branch on a parsed token response.
fn into_exchange(fields: &Value) -> std::result::Result<TokenExchange, Option<ApiFailure>> {
    match fields.get(ACCESS_TOKEN_KEY).and_then(Value::as_str) {
        Some(token) => Ok(TokenExchange {
            access_token: token.to_string(),
            expires_at: expires(fields),
        }),
        None => Err(ApiFailure::from_value(fields)),
    }
}

fn finish_exchange(fields: Value) -> Result<TokenExchange> {
    match into_exchange(&fields) {
        Ok(exchange) => {
            tracing::debug!(expires = ?exchange.expires_at, "token exchange succeeded");
            Ok(exchange)
        }
        Err(failure) => Err(authentication_failure(failure)),
    }
}

fn authentication_failure(failure: Option<ApiFailure>) -> GraphError {
    let message = failure.map_or_else(
        || "token response did not contain an access token".to_string(),
        |f| f.message,
    );
    tracing::debug!(%message, "token exchange failed");
    GraphError::authentication(message)
}

/// Reads `expires` (or `expires_in` on newer API versions) as seconds.
///
/// Fractional values are truncated to whole seconds. Negative, non-finite,
/// or non-numeric values mean no known expiry.
fn expires(fields: &Value) -> Option<Duration> {
    let raw = fields.get("expires").or_else(|| fields.get("expires_in"))?;
    let secs = match raw {
        Value::Number(n) => n.as_u64().or_else(|| whole_seconds(n.as_f64()?))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse().ok().or_else(|| whole_seconds(s.parse().ok()?))?
        }
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

fn whole_seconds(secs: f64) -> Option<u64> {
    (secs.is_finite() && secs >= 0.0).then(|| secs.trunc() as u64)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
