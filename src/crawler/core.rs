//! The core Crawler implementation.
//!
//! The `Crawler` ties together the scheduler, fetcher, spider and item
//! pipeline for one run. Build one with [`CrawlerBuilder`](crate::CrawlerBuilder)
//! and consume it with [`Crawler::run`].

use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use super::{CrawlHandle, ItemPipeline, admit_request, fetch_request, parse_response};
use crate::builder::CrawlerConfig;
use crate::error::SpiderError;
use crate::fetcher::Fetcher;
use crate::observer::ObserverRegistry;
use crate::request::{Request, fingerprint};
use crate::scheduler::Scheduler;
use crate::spider::Spider;
use crate::stats::{CrawlSummary, StatCollector};

/// The crawl driver: dequeues tasks, fetches them, parses successful
/// responses and pipes the resulting items.
pub struct Crawler<S: Spider, F: Fetcher> {
    scheduler: Scheduler,
    fetcher: F,
    spider: S,
    pipeline: ItemPipeline<S::Item>,
    observers: ObserverRegistry,
    stats: Arc<StatCollector>,
    config: CrawlerConfig,
}

impl<S, F> Crawler<S, F>
where
    S: Spider,
    F: Fetcher,
{
    pub(crate) fn new(
        seeds: Vec<Request>,
        fetcher: F,
        spider: S,
        pipeline: ItemPipeline<S::Item>,
        observers: ObserverRegistry,
        config: CrawlerConfig,
    ) -> Self {
        let mut crawler = Crawler {
            scheduler: Scheduler::new(config.crawl_order),
            fetcher,
            spider,
            pipeline,
            observers,
            stats: Arc::new(StatCollector::new()),
            config,
        };
        for seed in seeds {
            crawler.schedule_request(seed);
        }
        crawler
    }

    /// Adds a URL to the queue before the run starts, as a depth-0 request.
    ///
    /// Applies the same checks as [`CrawlHandle::schedule`]: returns
    /// `Ok(false)` if the URL is already queued or is not http(s). Scheduling
    /// is idempotent, so calling this with a seed URL again has no effect.
    pub fn schedule(&mut self, url: &str) -> Result<bool, SpiderError> {
        let request = Request::parse(url)?;
        Ok(self.schedule_request(request))
    }

    fn schedule_request(&mut self, request: Request) -> bool {
        admit_request(
            &mut self.scheduler,
            &self.stats,
            self.config.max_depth,
            request,
        )
    }

    /// Runs the crawl until the queue is exhausted.
    ///
    /// Fetch failures, non-2xx statuses and spider errors are reported to the
    /// observers and never stop the run. A pipeline stage error does: the
    /// stages and the fetcher are still closed, then the error is returned.
    pub async fn run(self) -> Result<CrawlSummary, SpiderError> {
        let Crawler {
            mut scheduler,
            mut fetcher,
            mut spider,
            pipeline,
            observers,
            stats,
            config,
        } = self;

        info!(
            "Crawler '{}' starting with {} queued request(s), order {:?}, max depth {:?}",
            spider.name(),
            scheduler.len(),
            config.crawl_order,
            config.max_depth
        );

        if let Err(e) = fetcher.open().await {
            error!("Failed to open fetcher: {}", e);
            if let Err(close_err) = pipeline.close().await {
                warn!("Failed to close item pipelines: {}", close_err);
            }
            return Err(e.into());
        }
        debug!("Fetcher opened");

        let outcome = async {
            while let Some(request) = scheduler.next_request() {
                trace!(
                    "Dequeued {} (depth {}, {} remaining)",
                    request.url,
                    request.depth,
                    scheduler.len()
                );

                let Some(response) =
                    fetch_request(&fetcher, &request, &stats, &observers).await
                else {
                    continue;
                };

                if response.was_redirected() {
                    debug!("{} redirected to {}", request.url, response.url);
                    let same_resource = fingerprint(&response.url) == request.fingerprint();
                    if !scheduler.mark_as_visited(&response.url) && !same_resource {
                        debug!(
                            "Redirect target {} was already visited, skipping parse",
                            response.url
                        );
                        continue;
                    }
                }

                let mut crawl = CrawlHandle::new(
                    &mut scheduler,
                    &stats,
                    &observers,
                    &request,
                    &response.url,
                    config.max_depth,
                );
                parse_response(&mut spider, &response, &mut crawl, &pipeline).await?;
            }
            Ok::<(), SpiderError>(())
        }
        .await;

        info!("Closing item pipelines...");
        let closed = pipeline.close().await;

        if let Err(e) = fetcher.close().await {
            warn!("Failed to close fetcher: {}", e);
        } else {
            debug!("Fetcher closed");
        }

        if let Err(e) = outcome {
            error!("Crawl halted: {}", e);
            return Err(e);
        }
        closed?;

        let summary = stats.summary(scheduler.visited());
        info!(
            "Crawl finished successfully. Stats: requests_enqueued={}, requests_succeeded={}, items_scraped={}",
            summary.requests_enqueued, summary.requests_succeeded, summary.items_scraped
        );
        observers.notify_complete(&summary);
        Ok(summary)
    }

    /// Returns a cloned Arc to the `StatCollector` instance used by this crawler.
    ///
    /// The collector outlives the run, so counters can still be read after
    /// [`run`](Self::run) has consumed the crawler.
    pub fn get_stats(&self) -> Arc<StatCollector> {
        Arc::clone(&self.stats)
    }

    /// Number of requests waiting in the queue.
    pub fn queued(&self) -> usize {
        self.scheduler.len()
    }

    /// Names of the registered pipeline stages, in processing order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.pipeline.stage_names()
    }
}
