//! Fetches one request and classifies the outcome.
//!
//! Only a 2xx response is handed on for parsing. Transport failures,
//! timeouts and non-2xx statuses are counted, reported to the observers and
//! dropped; none of them stops the crawl, and none is retried.

use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::fetcher::Fetcher;
use crate::observer::{CrawlFailure, ObserverRegistry};
use crate::request::Request;
use crate::response::Response;
use crate::stats::StatCollector;

pub(crate) async fn fetch_request<F: Fetcher>(
    fetcher: &F,
    request: &Request,
    stats: &StatCollector,
    observers: &ObserverRegistry,
) -> Option<Response> {
    trace!("Downloading request for URL: {}", request.url);
    stats.increment_requests_sent();
    let start_time = Instant::now();

    let response = match fetcher.fetch(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(
                "Download failed for URL {} after {:?}: {}",
                request.url,
                start_time.elapsed(),
                e
            );
            stats.increment_requests_failed();
            observers.notify_failure(&CrawlFailure::from_fetch_error(request.url.clone(), &e));
            return None;
        }
    };

    stats.record_response(response.status.as_u16(), response.body.len());
    if !response.is_success() {
        debug!(
            "Non-success status {} for URL {}",
            response.status, request.url
        );
        stats.increment_responses_non_success();
        observers.notify_failure(&CrawlFailure::from_status(request.url.clone(), response.status));
        return None;
    }

    trace!(
        "Download successful for URL: {}, took {:?}",
        response.url,
        start_time.elapsed()
    );
    stats.increment_requests_succeeded();
    Some(response)
}
