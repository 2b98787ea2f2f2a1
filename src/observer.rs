//! Operator-visible reporting of crawl failures and the end-of-run summary.
//!
//! The crawler never swallows a failure: every fetch, status or extraction
//! failure is handed to each registered [`CrawlObserver`]. When no observer is
//! registered, [`LogObserver`] is used.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::error::FetchError;
use crate::stats::CrawlSummary;

/// What went wrong with a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The exchange could not complete (connection, DNS, TLS).
    Transport,
    /// The fetch did not complete within the fetcher's timeout.
    Timeout,
    /// The server answered with a non-2xx status.
    Status,
    /// The spider could not process the page.
    Extraction,
}

/// A non-fatal failure for one URL.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlFailure {
    pub url: Url,
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub reason: String,
}

impl CrawlFailure {
    pub fn from_fetch_error(url: Url, error: &FetchError) -> Self {
        let kind = if error.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Transport
        };
        Self {
            url,
            kind,
            status: None,
            reason: error.to_string(),
        }
    }

    pub fn from_status(url: Url, status: reqwest::StatusCode) -> Self {
        Self {
            url,
            kind: FailureKind::Status,
            status: Some(status.as_u16()),
            reason: status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string(),
        }
    }

    pub fn extraction(url: Url, reason: impl Into<String>) -> Self {
        Self {
            url,
            kind: FailureKind::Extraction,
            status: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CrawlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} failure for {} ({}): {}", self.kind, self.url, status, self.reason),
            None => write!(f, "{:?} failure for {}: {}", self.kind, self.url, self.reason),
        }
    }
}

/// Receives crawl failures and the final summary.
pub trait CrawlObserver: Send + Sync {
    /// Called once per failed task.
    fn on_failure(&self, _failure: &CrawlFailure) {}

    /// Called once when the queue is exhausted.
    fn on_complete(&self, _summary: &CrawlSummary) {}
}

/// Writes failures and the summary to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl CrawlObserver for LogObserver {
    fn on_failure(&self, failure: &CrawlFailure) {
        warn!(
            url = %failure.url,
            kind = ?failure.kind,
            status = ?failure.status,
            "{}",
            failure.reason
        );
    }

    fn on_complete(&self, summary: &CrawlSummary) {
        info!(
            "Crawl complete: {} pages visited, {} failures, {} records scraped, {} completed the pipeline",
            summary.visited.len(),
            summary.failures(),
            summary.items_scraped,
            summary.items_processed
        );
    }
}

/// Fans events out to every registered observer, in registration order.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn CrawlObserver>) {
        self.observers.push(observer);
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify_failure(&self, failure: &CrawlFailure) {
        for observer in &self.observers {
            observer.on_failure(failure);
        }
    }

    pub fn notify_complete(&self, summary: &CrawlSummary) {
        for observer in &self.observers {
            observer.on_complete(summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl CrawlObserver for Recording {
        fn on_failure(&self, failure: &CrawlFailure) {
            self.0.lock().unwrap().push(failure.to_string());
        }
    }

    #[test]
    fn status_failures_carry_code_and_reason() {
        let url = Url::parse("https://example.test/page1").unwrap();
        let failure = CrawlFailure::from_status(url, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.kind, FailureKind::Status);
        assert_eq!(failure.status, Some(500));
        assert_eq!(failure.reason, "Internal Server Error");
    }

    #[test]
    fn timeouts_are_classified() {
        let url = Url::parse("https://example.test/slow").unwrap();
        let err = FetchError::Timeout(std::time::Duration::from_millis(10));
        assert_eq!(CrawlFailure::from_fetch_error(url, &err).kind, FailureKind::Timeout);
    }

    #[test]
    fn registry_notifies_every_observer() {
        let first = Arc::new(Recording::default());
        let second = Arc::new(Recording::default());
        let mut registry = ObserverRegistry::new();
        registry.register(first.clone());
        registry.register(second.clone());

        let url = Url::parse("https://example.test/").unwrap();
        registry.notify_failure(&CrawlFailure::extraction(url, "bad markup"));

        assert_eq!(first.0.lock().unwrap().len(), 1);
        assert_eq!(second.0.lock().unwrap().len(), 1);
    }
}
