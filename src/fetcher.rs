//! # Fetcher Module
//!
//! The [`Fetcher`] trait resolves a [`Request`] into a [`Response`] and the
//! default [`ReqwestFetcher`] does so over HTTP.
//!
//! A fetcher has a lifecycle scoped to one crawl run: the crawler calls
//! [`Fetcher::open`] before the first fetch and [`Fetcher::close`] after the
//! last one. Non-2xx statuses are *not* errors at this level; they come back
//! as responses and the crawler decides what to do with them. Only failures to
//! complete the exchange (connection, DNS, TLS, timeout) are [`FetchError`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::FetchError;
use crate::request::Request;
use crate::response::Response;

/// Resolves requests into responses.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Acquires whatever the fetcher needs for a run.
    async fn open(&mut self) -> Result<(), FetchError> {
        Ok(())
    }

    /// Fetches a single request.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;

    /// Releases resources acquired by [`open`](Self::open).
    async fn close(&mut self) -> Result<(), FetchError> {
        Ok(())
    }
}

/// Settings for [`ReqwestFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Per-fetch timeout in milliseconds. Expiry is reported as a fetch failure.
    pub timeout_ms: u64,
    /// Maximum redirects to follow before giving up.
    pub max_redirects: usize,
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("spiderline/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_ms: 30_000,
            max_redirects: 10,
        }
    }
}

/// HTTP fetcher backed by `reqwest`. The client is built on `open` and
/// dropped on `close`.
#[derive(Debug, Default)]
pub struct ReqwestFetcher {
    config: FetcherConfig,
    client: Option<reqwest::Client>,
}

impl ReqwestFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    fn map_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.config.timeout())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn open(&mut self) -> Result<(), FetchError> {
        if self.client.is_some() {
            return Ok(());
        }
        let client = reqwest::Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .timeout(self.config.timeout())
            .redirect(reqwest::redirect::Policy::limited(self.config.max_redirects))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        debug!(
            "HTTP client opened (timeout {:?}, max redirects {})",
            self.config.timeout(),
            self.config.max_redirects
        );
        self.client = Some(client);
        Ok(())
    }

    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let client = self.client.as_ref().ok_or(FetchError::NotOpen)?;

        trace!("GET {}", request.url);
        let response = client
            .get(request.url.clone())
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;

        let mut fetched = Response::new(request.clone(), status, body).with_url(final_url);
        fetched.content_type = content_type;
        Ok(fetched)
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        if self.client.take().is_some() {
            debug!("HTTP client closed");
        }
        Ok(())
    }
}
