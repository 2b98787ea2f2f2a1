//! The handle spiders and pipeline stages use to talk back to the crawler
//! while a page is being processed.

use tracing::{debug, trace};
use url::Url;

use crate::error::SpiderError;
use crate::observer::{CrawlFailure, ObserverRegistry};
use crate::request::Request;
use crate::scheduler::Scheduler;
use crate::stats::StatCollector;

/// A borrowed view of the crawler for the duration of one page.
pub struct CrawlHandle<'a> {
    scheduler: &'a mut Scheduler,
    stats: &'a StatCollector,
    observers: &'a ObserverRegistry,
    current: &'a Request,
    base: &'a Url,
    max_depth: Option<usize>,
    scheduled: usize,
}

impl<'a> CrawlHandle<'a> {
    pub(crate) fn new(
        scheduler: &'a mut Scheduler,
        stats: &'a StatCollector,
        observers: &'a ObserverRegistry,
        current: &'a Request,
        base: &'a Url,
        max_depth: Option<usize>,
    ) -> Self {
        Self {
            scheduler,
            stats,
            observers,
            current,
            base,
            max_depth,
            scheduled: 0,
        }
    }

    /// Schedules a follow-up URL, resolved against the current page's final
    /// URL.
    ///
    /// Returns `Ok(true)` when the URL was queued and `Ok(false)` when it was
    /// skipped: already visited or queued, not http(s), or beyond the depth
    /// limit. A link that cannot be resolved into a URL is an error.
    pub fn schedule(&mut self, url: &str) -> Result<bool, SpiderError> {
        let url = self.base.join(url)?;
        let request = self.current.child(url);
        Ok(self.schedule_request(request))
    }

    /// Schedules a prepared request as is.
    pub fn schedule_request(&mut self, request: Request) -> bool {
        let queued = admit_request(self.scheduler, self.stats, self.max_depth, request);
        if queued {
            self.scheduled += 1;
        }
        queued
    }

    /// Reports a non-fatal extraction problem for the current page.
    pub fn report(&self, reason: impl Into<String>) {
        let failure = CrawlFailure::extraction(self.base.clone(), reason);
        trace!("Reporting extraction failure: {}", failure);
        self.observers.notify_failure(&failure);
    }

    /// The request being processed.
    pub fn current_request(&self) -> &Request {
        self.current
    }

    /// The final URL of the page being processed.
    pub fn base_url(&self) -> &Url {
        self.base
    }

    /// Depth of the page being processed.
    pub fn depth(&self) -> usize {
        self.current.depth
    }

    /// Requests queued through this handle so far.
    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    pub(crate) fn stats(&self) -> &StatCollector {
        self.stats
    }

    pub(crate) fn observers(&self) -> &ObserverRegistry {
        self.observers
    }
}

/// Queues `request` unless it is not http(s), lies beyond `max_depth`, or
/// is already visited or queued. Returns whether it was queued.
pub(crate) fn admit_request(
    scheduler: &mut Scheduler,
    stats: &StatCollector,
    max_depth: Option<usize>,
    request: Request,
) -> bool {
    if !matches!(request.url.scheme(), "http" | "https") {
        debug!("Skipping non-HTTP URL: {}", request.url);
        return false;
    }
    if let Some(max_depth) = max_depth.filter(|max| request.depth > *max) {
        debug!(
            "Skipping {} at depth {} (max depth {})",
            request.url, request.depth, max_depth
        );
        stats.increment_requests_skipped();
        return false;
    }
    if scheduler.enqueue_request(request) {
        stats.increment_requests_enqueued();
        true
    } else {
        false
    }
}

/// Owns everything a [`CrawlHandle`] borrows, for unit tests of spiders and
/// stages.
#[cfg(test)]
pub(crate) struct HandleFixture {
    pub scheduler: Scheduler,
    pub stats: StatCollector,
    pub observers: ObserverRegistry,
    pub request: Request,
    pub max_depth: Option<usize>,
}

#[cfg(test)]
impl HandleFixture {
    pub fn new(url: &str) -> Self {
        Self {
            scheduler: Scheduler::default(),
            stats: StatCollector::default(),
            observers: ObserverRegistry::new(),
            request: Request::parse(url).unwrap(),
            max_depth: None,
        }
    }

    pub fn handle(&mut self) -> CrawlHandle<'_> {
        CrawlHandle::new(
            &mut self.scheduler,
            &self.stats,
            &self.observers,
            &self.request,
            &self.request.url,
            self.max_depth,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_resolves_relative_links() {
        let mut fixture = HandleFixture::new("https://example.test/list/page1");
        let mut crawl = fixture.handle();

        assert!(crawl.schedule("page2").unwrap());
        assert!(!crawl.schedule("/list/page2#top").unwrap());
        assert_eq!(crawl.scheduled(), 1);

        let queued = fixture.scheduler.next_request().unwrap();
        assert_eq!(queued.url.as_str(), "https://example.test/list/page2");
        assert_eq!(queued.depth, 1);
        assert_eq!(
            queued.referrer.unwrap().as_str(),
            "https://example.test/list/page1"
        );
    }

    #[test]
    fn depth_limit_skips_deeper_links() {
        let mut fixture = HandleFixture::new("https://example.test/");
        fixture.max_depth = Some(0);
        let mut crawl = fixture.handle();

        assert!(!crawl.schedule("/deeper").unwrap());
        assert!(fixture.scheduler.is_empty());
        assert_eq!(fixture.stats.summary(&[]).requests_skipped, 1);
    }

    #[test]
    fn non_http_links_are_ignored() {
        let mut fixture = HandleFixture::new("https://example.test/");
        let mut crawl = fixture.handle();
        assert!(!crawl.schedule("mailto:someone@example.test").unwrap());
    }

    #[test]
    fn unresolvable_links_are_errors() {
        let mut fixture = HandleFixture::new("https://example.test/");
        let mut crawl = fixture.handle();
        assert!(matches!(
            crawl.schedule("http://[::1"),
            Err(SpiderError::UrlError(_))
        ));
    }
}
