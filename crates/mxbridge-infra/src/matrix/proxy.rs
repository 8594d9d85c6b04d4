//! Pass-through forwarding of `/_matrix/...` requests to the homeserver.
//!
//! Lets a browser client served by the gateway reach the homeserver through
//! the same origin. Only a small allow-list of request headers is forwarded.

use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use thiserror::Error;
use tracing::debug;

/// Upper bound for a single proxied request.
pub const PROXY_TIMEOUT: Duration = Duration::from_secs(60);

const FORWARDED_HEADERS: [reqwest::header::HeaderName; 3] = [CONTENT_TYPE, AUTHORIZATION, ACCEPT];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid proxy target '{0}'")]
    InvalidTarget(String),

    #[error("homeserver request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Buffered upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Forwards requests under `/_matrix/` to a fixed homeserver.
#[derive(Debug, Clone)]
pub struct MatrixProxy {
    http: reqwest::Client,
    homeserver: Url,
}

impl MatrixProxy {
    pub fn new(homeserver: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            homeserver,
        }
    }

    pub fn homeserver(&self) -> &Url {
        &self.homeserver
    }

    /// Resolve an incoming `/_matrix/...` path (with optional query) against the homeserver.
    ///
    /// The check runs on the parsed URL, after dot segments (including
    /// percent-encoded ones) have been resolved, so a path cannot climb out
    /// of `/_matrix/` on the homeserver.
    pub fn target(&self, path_and_query: &str) -> Result<Url, ProxyError> {
        let invalid = || ProxyError::InvalidTarget(path_and_query.to_string());
        if !path_and_query.starts_with('/') {
            return Err(invalid());
        }

        let base = self.homeserver.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{base}{path_and_query}")).map_err(|_| invalid())?;

        let prefix = format!("{}/_matrix/", self.homeserver.path().trim_end_matches('/'));
        if url.origin() != self.homeserver.origin() || !url.path().starts_with(&prefix) {
            return Err(invalid());
        }
        Ok(url)
    }

    /// Replay a request against the homeserver and buffer its response.
    ///
    /// Any upstream status is passed back as-is; only transport failures
    /// and timeouts are errors.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Vec<u8>,
    ) -> Result<ProxyResponse, ProxyError> {
        let url = self.target(path_and_query)?;
        debug!(%method, %url, "proxying request to homeserver");

        let mut request = self.http.request(method, url).timeout(PROXY_TIMEOUT);
        for name in &FORWARDED_HEADERS {
            if let Some(value) = headers.get(name) {
                request = request.header(name, value);
            }
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(ProxyResponse {
            status,
            content_type,
            body,
        })
    }
}
