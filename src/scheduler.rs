//! # Scheduler Module
//!
//! Implements the crawl frontier: the queue of pending requests and the set
//! of visited URLs.
//!
//! ## Overview
//!
//! The `Scheduler` is exclusively owned by the [`Crawler`](crate::Crawler).
//! Spiders and pipeline stages reach it through a
//! [`CrawlHandle`](crate::CrawlHandle) while a page is being processed.
//!
//! ## Duplicate Detection
//!
//! Requests are keyed by their [fingerprint](crate::request::fingerprint). A
//! request is refused when its fingerprint is already visited or already
//! queued, so scheduling is idempotent. A fingerprint is added to the visited
//! set when its request is dequeued; the set only grows during a run.
//!
//! ## Ordering
//!
//! [`CrawlOrder::DepthFirst`] (the default) pops the most recently scheduled
//! request first, like a stack. [`CrawlOrder::BreadthFirst`] pops the oldest.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};
use url::Url;

use crate::request::{Request, fingerprint};

/// The order in which queued requests are taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlOrder {
    /// Last in, first out.
    #[default]
    DepthFirst,
    /// First in, first out.
    BreadthFirst,
}

pub struct Scheduler {
    request_queue: VecDeque<Request>,
    queued_urls: HashSet<String>,
    visited_urls: HashSet<String>,
    visit_order: Vec<String>,
    order: CrawlOrder,
}

impl Scheduler {
    pub fn new(order: CrawlOrder) -> Self {
        Self {
            request_queue: VecDeque::new(),
            queued_urls: HashSet::new(),
            visited_urls: HashSet::new(),
            visit_order: Vec::new(),
            order,
        }
    }

    /// Queues a request unless its URL was already visited or is already
    /// queued. Returns `true` if the request was added.
    pub fn enqueue_request(&mut self, request: Request) -> bool {
        let fingerprint = request.fingerprint();
        if self.visited_urls.contains(&fingerprint) {
            trace!("Request already visited, skipping: {}", request.url);
            return false;
        }
        if !self.queued_urls.insert(fingerprint) {
            trace!("Request already queued, skipping: {}", request.url);
            return false;
        }
        trace!("Enqueuing request: {}", request.url);
        self.request_queue.push_back(request);
        true
    }

    /// Takes the next request according to the crawl order and marks it
    /// visited.
    pub fn next_request(&mut self) -> Option<Request> {
        let request = match self.order {
            CrawlOrder::DepthFirst => self.request_queue.pop_back(),
            CrawlOrder::BreadthFirst => self.request_queue.pop_front(),
        }?;
        let fingerprint = request.fingerprint();
        self.queued_urls.remove(&fingerprint);
        self.mark_fingerprint(fingerprint);
        Some(request)
    }

    /// Marks a URL as visited without fetching it, e.g. the target of a
    /// redirect. A queued request for the same URL is discarded.
    ///
    /// Returns `false` if the URL was already visited.
    pub fn mark_as_visited(&mut self, url: &Url) -> bool {
        let fingerprint = fingerprint(url);
        if self.queued_urls.remove(&fingerprint) {
            self.request_queue.retain(|r| r.fingerprint() != fingerprint);
            debug!("Discarded queued request already reached by redirect: {}", url);
        }
        self.mark_fingerprint(fingerprint)
    }

    fn mark_fingerprint(&mut self, fingerprint: String) -> bool {
        if self.visited_urls.insert(fingerprint.clone()) {
            trace!("Marked URL as visited: {}", fingerprint);
            self.visit_order.push(fingerprint);
            true
        } else {
            false
        }
    }

    /// Checks if a fingerprint has been visited.
    pub fn has_been_visited(&self, fingerprint: &str) -> bool {
        self.visited_urls.contains(fingerprint)
    }

    /// Visited fingerprints, in the order they were marked.
    pub fn visited(&self) -> &[String] {
        &self.visit_order
    }

    pub fn order(&self) -> CrawlOrder {
        self.order
    }

    /// Returns the number of pending requests.
    #[inline]
    pub fn len(&self) -> usize {
        self.request_queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.request_queue.is_empty()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(CrawlOrder::default())
    }
}
