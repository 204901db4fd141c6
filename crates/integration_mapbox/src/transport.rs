//! HTTP transport abstraction
//!
//! The client only builds requests and decodes responses; the round trip
//! itself goes through an [`HttpTransport`], so callers can inject their own
//! (proxies, recorded fixtures, test stubs).

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::error::MapboxError;

/// User agent sent by [`ReqwestTransport`]
pub const USER_AGENT: &str = concat!("integration_mapbox/", env!("CARGO_PKG_VERSION"));

/// An outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// A `GET` request without body
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// A `POST` request carrying `body`
    #[must_use]
    pub fn post(url: Url, body: Vec<u8>) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// Path of the target URL, safe to log (the query carries the access token)
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A fully read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub const fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Whether the status is in 200-299
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Performs a single HTTP round trip
///
/// Implementations must be safe to share between concurrent callers and must
/// not retry on their own.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the status with the body
    ///
    /// The body only needs to be populated for 2xx responses.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MapboxError>;
}

/// Default transport backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout_secs`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(timeout_secs: u64) -> Result<Self, MapboxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MapboxError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path()))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MapboxError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MapboxError::from_reqwest(&e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            // Dropping the response releases the connection without reading the body.
            debug!(%status, "Skipping body of unsuccessful response");
            return Ok(HttpResponse::new(status, Vec::new()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MapboxError::from_reqwest(&e, self.timeout_secs))?;

        debug!(%status, bytes = body.len(), "Received response");
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
