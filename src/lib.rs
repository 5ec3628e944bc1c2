//! Blocking Rust client for the Facebook Graph API.
//!
//! Handles the OAuth dialog and token exchanges, sends authenticated
//! requests, and materializes JSON responses into navigable objects,
//! including lazily fetched paginated collections.
//!
//! # Modules
//!
//! - [`auth`]: OAuth dialog URLs, code and long-lived token exchange.
//! - [`client`]: `GraphClient`, the composition root.
//! - [`config`]: endpoint bases and client configuration.
//! - [`dispatch`]: request URL assembly and GET/POST selection.
//! - [`error`]: typed error hierarchy (`GraphError`).
//! - [`object`]: dynamic response objects and the object factory.
//! - [`paging`]: lazy traversal of paginated collections.
//! - [`query`]: table-name extraction for the legacy query endpoint.
//! - [`transport`]: the HTTP collaborator and its blocking default.
//!
//! # Quick Start
//!
//! ```ignore
//! use fbgraph::client::GraphClient;
//! use fbgraph::config::ClientConfig;
//!
//! let mut client = GraphClient::new(ClientConfig::new("app-id").with_permissions(["email"]))?;
//! println!("{}", client.auth_code_url(Some("https://example.com/cb"), None)?);
//! client.get_access_token("app-secret", "code-from-redirect", Some("https://example.com/cb"))?;
//! for photo in client.get_photos(None)? {
//!     println!("{:?}", photo?.str_field("id"));
//! }
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod object;
pub mod paging;
pub mod query;
pub mod transport;
