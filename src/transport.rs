//! The HTTP collaborator the dispatcher sends requests through.
//!
//! The library never retries, times out, or pools on its own; all of that is
//! the transport's business. [`HttpTransport`] is the default, a blocking
//! `reqwest` client with explicit timeouts. Anything implementing
//! [`Transport`] can stand in for it (tests use a scripted in-memory one).

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Connect timeout: TCP + TLS handshake only.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout, including reading the response body.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw response handed back by a [`Transport`].
///
/// The status is informational only. The Graph API reports failures through
/// an `error` envelope in the body, which the caller inspects.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Bytes,
}

/// A synchronous request function returning a status and byte payload.
pub trait Transport: Send + Sync {
    /// Sends a GET to `url` with `params` as the query string.
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<TransportResponse>;

    /// Sends a POST to `url` with `form` as an urlencoded body.
    fn post(&self, url: &str, form: &[(String, String)]) -> Result<TransportResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<TransportResponse> {
        (**self).get(url, params)
    }

    fn post(&self, url: &str, form: &[(String, String)]) -> Result<TransportResponse> {
        (**self).post(url, form)
    }
}

/// Blocking `reqwest` transport.
///
/// Must not be used from inside an async task; wrap calls in
/// `spawn_blocking` when driving the client from async code.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds the underlying client with explicit connect/request timeouts.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(HttpTransport { client })
    }

    fn read(response: reqwest::blocking::Response) -> Result<TransportResponse> {
        let status = response.status().as_u16();
        let body = response.bytes()?;
        Ok(TransportResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<TransportResponse> {
        let response = self.client.get(url).query(params).send()?;
        Self::read(response)
    }

    fn post(&self, url: &str, form: &[(String, String)]) -> Result<TransportResponse> {
        let response = self.client.post(url).form(form).send()?;
        Self::read(response)
    }
}
