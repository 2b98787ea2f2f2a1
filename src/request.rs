//! A pending unit of crawl work.
//!
//! A [`Request`] is created by the seed configuration or by a spider (through
//! the [`CrawlHandle`](crate::CrawlHandle)) and is consumed when the crawler
//! dequeues it. Deduplication works on the request's *fingerprint*, the
//! normalized form of its URL.

use serde::{Deserialize, Serialize};
use url::Url;

/// A URL to fetch together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// The URL to fetch.
    pub url: Url,
    /// Link distance from the seed. Seeds have depth 0.
    pub depth: usize,
    /// The page that scheduled this request, if any.
    pub referrer: Option<Url>,
}

impl Request {
    /// Creates a seed-level request for `url`.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            referrer: None,
        }
    }

    /// Parses `url` and creates a seed-level request for it.
    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        Url::parse(url).map(Self::new)
    }

    /// Creates a request one level deeper than `self`, referred by `self`.
    pub fn child(&self, url: Url) -> Self {
        Self {
            url,
            depth: self.depth + 1,
            referrer: Some(self.url.clone()),
        }
    }

    /// Returns the normalized URL used to detect duplicates.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.url)
    }
}

/// Normalizes a URL for deduplication.
///
/// Scheme and host case and default ports are already canonical after
/// parsing. On top of that the fragment is removed, and a trailing slash is
/// removed from any path other than the root.
pub fn fingerprint(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let path = normalized.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        let trimmed = if trimmed.is_empty() { "/".to_string() } else { trimmed };
        normalized.set_path(&trimmed);
    }

    normalized.into()
}
