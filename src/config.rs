//! Endpoint bases and per-client configuration.
//!
//! All Graph API URLs are assembled by string concatenation against a small
//! set of fixed bases. [`Endpoints`] holds those bases so tests can point a
//! client at a local mock server; [`ClientConfig`] carries everything a
//! [`GraphClient`](crate::client::GraphClient) is constructed from.

/// Root of the web front end (OAuth and feed dialogs).
pub const FACEBOOK_URL: &str = "https://www.facebook.com/";

/// Graph API version every request is pinned to.
pub const GRAPH_API_VERSION: &str = "v5.0";

/// Versioned Graph API base.
pub const GRAPH_URL: &str = "https://graph.facebook.com/v5.0/";

/// Legacy REST API base.
pub const API_URL: &str = "https://api.facebook.com/";

/// Redirect target used by the OAuth dialog when the caller supplies none.
pub const DEFAULT_REDIRECT_URI: &str = "http://www.facebook.com/connect/login_success.html";

/// Redirect target used by the feed dialog when the caller supplies none.
pub const DEFAULT_DIALOG_URI: &str = "http://www.example.com/response/";

/// Permissions requested when the caller configures none.
pub const DEFAULT_SCOPE: &[&str] = &["email"];

/// The fixed endpoint bases a client talks to.
///
/// Each base ends with `/`, so paths are appended directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    www: String,
    graph: String,
    legacy_api: String,
}

impl Endpoints {
    /// The production Facebook endpoints.
    pub fn facebook() -> Self {
        Endpoints {
            www: FACEBOOK_URL.to_string(),
            graph: GRAPH_URL.to_string(),
            legacy_api: API_URL.to_string(),
        }
    }

    /// Places every base under a single root, used by tests to point at a
    /// local mock server. `base` must not end with `/`.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Endpoints {
            www: format!("{base}/"),
            graph: format!("{base}/{GRAPH_API_VERSION}/"),
            legacy_api: format!("{base}/api/"),
        }
    }

    /// Versioned Graph API base; authenticated paths are appended to it.
    pub fn graph(&self) -> &str {
        &self.graph
    }

    /// Legacy REST API base.
    ///
    /// No client operation targets it: queries go through the versioned
    /// `fql` endpoint. It is kept so callers issuing raw legacy calls through
    /// [`RequestDispatcher::make_request`](crate::dispatch::RequestDispatcher::make_request)
    /// resolve it against the same root as everything else.
    pub fn legacy_api(&self) -> &str {
        &self.legacy_api
    }

    /// OAuth dialog URL, ready for an encoded query string.
    pub fn auth_dialog_url(&self) -> String {
        format!("{}dialog/oauth?", self.www)
    }

    /// Feed dialog URL, ready for an encoded query string.
    pub fn feed_dialog_url(&self) -> String {
        format!("{}dialog/feed?", self.www)
    }

    /// Token exchange endpoint, ready for an encoded query string.
    pub fn token_url(&self) -> String {
        format!("{}oauth/access_token?", self.graph)
    }

    /// Legacy query endpoint, ready for an encoded query string.
    pub fn query_url(&self) -> String {
        format!("{}fql?", self.graph)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints::facebook()
    }
}

/// Construction parameters for a [`GraphClient`](crate::client::GraphClient).
///
/// ```
/// use fbgraph::config::ClientConfig;
///
/// let config = ClientConfig::new("123456")
///     .with_permissions(["email", "user_photos"])
///     .raw_data(true);
/// assert_eq!(config.permissions, vec!["email", "user_photos"]);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Application (client) ID.
    pub app_id: String,
    /// Token obtained elsewhere, if any.
    pub access_token: Option<String>,
    /// Return parsed JSON trees without a kind tag.
    pub raw_data: bool,
    /// Requested permissions, in the order they are sent as `scope`.
    pub permissions: Vec<String>,
    /// Endpoint bases.
    pub endpoints: Endpoints,
}

impl ClientConfig {
    /// Configuration with the default scope and production endpoints.
    pub fn new(app_id: impl Into<String>) -> Self {
        ClientConfig {
            app_id: app_id.into(),
            access_token: None,
            raw_data: false,
            permissions: DEFAULT_SCOPE.iter().map(|p| p.to_string()).collect(),
            endpoints: Endpoints::facebook(),
        }
    }

    /// Starts the client already authenticated.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Replaces the requested permissions. Order is preserved.
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Toggles raw-data mode.
    pub fn raw_data(mut self, raw: bool) -> Self {
        self.raw_data = raw;
        self
    }

    /// Overrides the endpoint bases.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}
