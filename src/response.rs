//! The immutable result of a fetch.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::borrow::Cow;
use url::Url;

use crate::request::Request;

/// A fetched resource. Owned by the crawler for one processing cycle and
/// lent to the spider by reference.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: StatusCode,
    /// The final URL after redirects.
    pub url: Url,
    /// Raw body.
    pub body: Bytes,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
    request: Request,
}

impl Response {
    /// Creates a response for `request` whose final URL is the request URL.
    pub fn new(request: Request, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            url: request.url.clone(),
            body: body.into(),
            content_type: None,
            fetched_at: Utc::now(),
            request,
        }
    }

    /// Sets the final resolved URL.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// The request this response answers.
    pub fn request_from_response(&self) -> &Request {
        &self.request
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether a redirect moved the resource away from the request URL.
    pub fn was_redirected(&self) -> bool {
        self.url != self.request.url
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Resolves a possibly relative link against the final URL.
    pub fn urljoin(&self, link: &str) -> Result<Url, url::ParseError> {
        self.url.join(link)
    }
}
