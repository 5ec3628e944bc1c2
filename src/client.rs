//! The Graph API client.
//!
//! `GraphClient` owns one set of [`Credentials`] and wires the token
//! manager, dispatcher and object factory together:
//!
//! - the authorization helpers build dialog URLs and run token exchanges,
//!   copying the resulting token into the credentials;
//! - [`get_one`](GraphClient::get_one), [`get_list`](GraphClient::get_list),
//!   [`push`](GraphClient::push), [`delete`](GraphClient::delete) and
//!   [`execute_query`](GraphClient::execute_query) issue authenticated calls
//!   with the stored token.
//!
//! Every call blocks until the transport returns. Clients share nothing, so
//! independent clients can live on different threads; a single client is
//! used from one thread at a time (exchanges take `&mut self`).

use serde::Serialize;

use crate::auth::{AuthFlavor, Credentials, TokenExchange, TokenManager};
use crate::config::{ClientConfig, DEFAULT_DIALOG_URI, Endpoints};
use crate::dispatch::RequestDispatcher;
use crate::error::{GraphError, Result};
use crate::object::{GraphObject, ObjectFactory};
use crate::paging::PaginatedCollection;
use crate::query::resolve_table_name;
use crate::transport::{HttpTransport, Transport};

/// Path segment used when no object ID is given.
const ME: &str = "me";

/// Kind assigned to push/delete results.
const RESPONSE_KIND: &str = "response";

#[derive(Serialize)]
struct DialogRequest<'a> {
    app_id: &'a str,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    q: &'a str,
    access_token: &'a str,
    format: &'a str,
}

/// Blocking client for the Graph API.
///
/// Design rationale:
/// - Credentials live on the client rather than in a global session, so two
///   clients for different apps or users never see each other's tokens.
/// - The token manager is built on demand from borrowed parts instead of
///   being stored, which keeps the credentials the single place a token is
///   written.
/// - Single-object calls run the error check before returning; list and
///   query calls check each page or payload as it arrives.
pub struct GraphClient {
    credentials: Credentials,
    endpoints: Endpoints,
    dispatcher: RequestDispatcher,
    factory: ObjectFactory,
}

impl GraphClient {
    /// Creates a client over the default [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// - `GraphError::Transport`: the HTTP client could not be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(config, HttpTransport::new()?))
    }

    /// Creates a client that sends requests through `transport`.
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        let ClientConfig {
            app_id,
            access_token,
            raw_data,
            permissions,
            endpoints,
        } = config;

        let mut credentials = Credentials::new(app_id, permissions);
        credentials.access_token = access_token;

        GraphClient {
            dispatcher: RequestDispatcher::new(Box::new(transport), endpoints.graph()),
            factory: ObjectFactory::new(raw_data),
            credentials,
            endpoints,
        }
    }

    /// Current credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Current access token, if authenticated.
    pub fn access_token(&self) -> Option<&str> {
        self.credentials.access_token.as_deref()
    }

    /// Installs a token obtained elsewhere (implicit flow, JS SDK, ...).
    /// Any previously reported expiry is cleared.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.credentials.access_token = Some(token.into());
        self.credentials.expires_at = None;
    }

    /// A token manager bound to this client's credentials.
    pub fn token_manager(&self) -> TokenManager<'_> {
        TokenManager::new(&self.credentials, &self.endpoints, &self.dispatcher)
    }

    // ── Authorization ────────────────────────────────────────────────

    /// URL of the OAuth dialog for the authorization-code flow.
    ///
    /// # Errors
    ///
    /// - `GraphError::Encode`: parameters could not be encoded.
    pub fn auth_code_url(&self, redirect_uri: Option<&str>, state: Option<&str>) -> Result<String> {
        self.token_manager()
            .authorization_url(AuthFlavor::Code, redirect_uri, state)
    }

    /// URL of the OAuth dialog for the implicit (`user_agent`) flow.
    ///
    /// # Errors
    ///
    /// - `GraphError::Encode`: parameters could not be encoded.
    pub fn auth_token_url(&self, redirect_uri: Option<&str>) -> Result<String> {
        self.token_manager()
            .authorization_url(AuthFlavor::Implicit, redirect_uri, None)
    }

    /// URL of the feed dialog. `redirect_uri` defaults to
    /// [`DEFAULT_DIALOG_URI`].
    ///
    /// # Errors
    ///
    /// - `GraphError::Encode`: parameters could not be encoded.
    pub fn dialog_url(&self, redirect_uri: Option<&str>) -> Result<String> {
        let request = DialogRequest {
            app_id: &self.credentials.app_id,
            redirect_uri: redirect_uri.unwrap_or(DEFAULT_DIALOG_URI),
        };
        Ok(format!(
            "{}{}",
            self.endpoints.feed_dialog_url(),
            serde_urlencoded::to_string(&request)?
        ))
    }

    /// Exchanges an authorization code and stores the resulting token.
    ///
    /// # Errors
    ///
    /// - `GraphError::Authentication`: the endpoint returned no token.
    /// - `GraphError::Transport`: the request failed.
    pub fn get_access_token(
        &mut self,
        app_secret: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<TokenExchange> {
        let exchange = self
            .token_manager()
            .exchange_code(app_secret, code, redirect_uri)?;
        self.credentials.apply(&exchange);
        Ok(exchange)
    }

    /// Exchanges a short-lived token for a long-lived one and stores it.
    ///
    /// # Errors
    ///
    /// - `GraphError::Authentication`: the endpoint returned no token.
    /// - `GraphError::Transport`: the request failed.
    pub fn exchange_token(
        &mut self,
        app_secret: &str,
        short_lived_token: &str,
    ) -> Result<TokenExchange> {
        let exchange = self
            .token_manager()
            .exchange_long_lived(app_secret, short_lived_token)?;
        self.credentials.apply(&exchange);
        Ok(exchange)
    }

    // ── Graph calls ──────────────────────────────────────────────────

    /// Fetches a single object at `path` and materializes it as `kind`.
    ///
    /// `extra_params` is an already-encoded query fragment such as
    /// `"fields=id,name"`.
    ///
    /// # Errors
    ///
    /// - `GraphError::Authentication`: no access token.
    /// - `GraphError::Api`: the response is an error envelope.
    /// - `GraphError::Parse`: the response is not JSON.
    /// - `GraphError::Transport`: the request failed.
    pub fn get_one(
        &self,
        path: &str,
        kind: &str,
        extra_params: Option<&str>,
    ) -> Result<GraphObject> {
        let payload =
            self.dispatcher
                .make_authenticated_request(self.access_token(), path, extra_params, None)?;
        self.factory.make_object(kind, &payload)?.check()
    }

    /// Fetches the `edge` collection of `id` (default `me`).
    ///
    /// The edge name is lowercased in the path; `kind` defaults to `edge`.
    /// Responses with a `paging` block become a lazy multi-page collection;
    /// anything else is read as a single page from its `data` array.
    ///
    /// # Errors
    ///
    /// Same as [`get_one`](Self::get_one) for the first page. Later pages
    /// report their errors through the collection.
    pub fn get_list(
        &self,
        id: Option<&str>,
        edge: &str,
        kind: Option<&str>,
    ) -> Result<PaginatedCollection<'_>> {
        let kind = kind.unwrap_or(edge);
        let path = format!("{}/{}", id.unwrap_or(ME), edge.to_lowercase());
        let first = self.get_one(&path, kind, None)?;

        Ok(self
            .factory
            .make_paginated_collection(&first, kind, &self.dispatcher, self.access_token())
            .unwrap_or_else(|| {
                PaginatedCollection::single_page(&self.factory, &self.dispatcher, kind, &first)
            }))
    }

    /// Posts `data` to the `edge` of `id` (default `me`).
    ///
    /// # Errors
    ///
    /// - `GraphError::Authentication`: no access token.
    /// - `GraphError::Api`: the response is an error envelope.
    /// - `GraphError::Parse` / `GraphError::Transport`: as for `get_one`.
    pub fn push(
        &self,
        id: Option<&str>,
        edge: &str,
        data: &[(String, String)],
    ) -> Result<GraphObject> {
        let path = format!("{}/{edge}", id.unwrap_or(ME));
        let payload =
            self.dispatcher
                .make_authenticated_request(self.access_token(), &path, None, Some(data))?;
        self.factory.make_object(RESPONSE_KIND, &payload)?.check()
    }

    /// Deletes the object `id` by posting `method=delete`.
    ///
    /// # Errors
    ///
    /// Same as [`push`](Self::push).
    pub fn delete(&self, id: &str) -> Result<GraphObject> {
        let form = [("method".to_string(), "delete".to_string())];
        let payload =
            self.dispatcher
                .make_authenticated_request(self.access_token(), id, None, Some(&form))?;
        self.factory.make_object(RESPONSE_KIND, &payload)?.check()
    }

    /// Runs a legacy query and returns its rows tagged with the table name.
    ///
    /// # Errors
    ///
    /// - `GraphError::QuerySyntax`: the table name cannot be resolved.
    /// - `GraphError::Authentication`: no access token.
    /// - `GraphError::Api`: the response is an error envelope.
    /// - `GraphError::Parse` / `GraphError::UnexpectedResponse`: the
    ///   response is not a row array.
    pub fn execute_query(&self, query: &str) -> Result<Vec<GraphObject>> {
        let table = resolve_table_name(query)?;
        let access_token = self.access_token().ok_or_else(|| {
            GraphError::authentication("must be authenticated to run a query")
        })?;

        let request = QueryRequest {
            q: query,
            access_token,
            format: "json",
        };
        let url = format!(
            "{}{}",
            self.endpoints.query_url(),
            serde_urlencoded::to_string(&request)?
        );
        tracing::debug!(table, "executing query");
        let payload = self.dispatcher.make_request(&url, None)?;
        self.factory.make_object_list(table, &payload)
    }

    // ── Conveniences ─────────────────────────────────────────────────

    /// The authenticated user.
    ///
    /// # Errors
    ///
    /// Same as [`get_one`](Self::get_one).
    pub fn get_myself(&self) -> Result<GraphObject> {
        self.get_one(ME, "User", None)
    }

    /// A user by ID.
    ///
    /// # Errors
    ///
    /// Same as [`get_one`](Self::get_one).
    pub fn get_user(&self, id: &str) -> Result<GraphObject> {
        self.get_one(id, "User", None)
    }

    /// Friends of `id` (default `me`).
    ///
    /// # Errors
    ///
    /// Same as [`get_list`](Self::get_list).
    pub fn get_friends(&self, id: Option<&str>) -> Result<PaginatedCollection<'_>> {
        self.get_list(id, "Friends", None)
    }

    /// Photos of `id` (default `me`).
    ///
    /// # Errors
    ///
    /// Same as [`get_list`](Self::get_list).
    pub fn get_photos(&self, id: Option<&str>) -> Result<PaginatedCollection<'_>> {
        self.get_list(id, "Photos", None)
    }

    /// Publishes `message` to the feed of `id` (default `me`).
    ///
    /// # Errors
    ///
    /// Same as [`push`](Self::push).
    pub fn publish(&self, id: Option<&str>, message: &str) -> Result<GraphObject> {
        self.push(id, "feed", &[("message".to_string(), message.to_string())])
    }
}
