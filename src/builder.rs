//! # Builder Module
//!
//! Provides the `CrawlerBuilder`, a fluent API for constructing and configuring
//! `Crawler` instances.
//!
//! ## Overview
//!
//! The builder collects the spider, the seed URL, the fetcher, the pipeline
//! stages and the observers, then validates them in [`CrawlerBuilder::build`].
//! Missing pieces get defaults: a [`ReqwestFetcher`], a
//! [`ConsoleWriterPipeline`] when no stage is registered and a
//! [`LogObserver`] when no observer is registered.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spiderline::prelude::*;
//!
//! async fn run_crawler(spider: MySpider) -> Result<CrawlSummary, SpiderError> {
//!     let crawler = CrawlerBuilder::new(spider)
//!         .seed("https://example.test/page1")
//!         .crawl_order(CrawlOrder::BreadthFirst)
//!         .add_pipeline(DeduplicationPipeline::new(["id"]))
//!         .build()?;
//!
//!     crawler.run().await
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::crawler::{Crawler, ItemPipeline};
use crate::error::SpiderError;
use crate::fetcher::{Fetcher, FetcherConfig, ReqwestFetcher};
use crate::observer::{CrawlObserver, LogObserver, ObserverRegistry};
use crate::pipeline::{ConsoleWriterPipeline, Pipeline};
use crate::request::Request;
use crate::scheduler::CrawlOrder;
use crate::spider::Spider;

/// Settings for the crawl driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Which queued request is taken next.
    pub crawl_order: CrawlOrder,
    /// Requests deeper than this (seeds are depth 0) are not scheduled.
    pub max_depth: Option<usize>,
}

pub struct CrawlerBuilder<S: Spider, F: Fetcher = ReqwestFetcher> {
    crawler_config: CrawlerConfig,
    fetcher: F,
    spider: S,
    seeds: Vec<String>,
    item_pipelines: ItemPipeline<S::Item>,
    observers: ObserverRegistry,
}

impl<S: Spider> CrawlerBuilder<S, ReqwestFetcher> {
    /// Creates a new `CrawlerBuilder` for a given spider with the default `ReqwestFetcher`.
    pub fn new(spider: S) -> Self {
        Self {
            crawler_config: CrawlerConfig::default(),
            fetcher: ReqwestFetcher::default(),
            spider,
            seeds: Vec::new(),
            item_pipelines: ItemPipeline::new(),
            observers: ObserverRegistry::new(),
        }
    }

    /// Configures the default HTTP fetcher.
    pub fn fetcher_config(mut self, config: FetcherConfig) -> Self {
        self.fetcher = ReqwestFetcher::new(config);
        self
    }
}

impl<S: Spider, F: Fetcher> CrawlerBuilder<S, F> {
    /// Replaces the whole crawler configuration.
    pub fn config(mut self, config: CrawlerConfig) -> Self {
        self.crawler_config = config;
        self
    }

    /// Sets the order in which queued requests are taken.
    pub fn crawl_order(mut self, order: CrawlOrder) -> Self {
        self.crawler_config.crawl_order = order;
        self
    }

    /// Limits how many links away from the seed the crawl may go.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.crawler_config.max_depth = Some(depth);
        self
    }

    /// Sets the starting URL of the run. Overrides the spider's `start_urls`.
    pub fn seed(mut self, url: impl Into<String>) -> Self {
        self.seeds.push(url.into());
        self
    }

    /// Swaps in a different fetcher.
    pub fn with_fetcher<F2: Fetcher>(self, fetcher: F2) -> CrawlerBuilder<S, F2> {
        CrawlerBuilder {
            crawler_config: self.crawler_config,
            fetcher,
            spider: self.spider,
            seeds: self.seeds,
            item_pipelines: self.item_pipelines,
            observers: self.observers,
        }
    }

    /// Adds an item pipeline stage. Stages run in the order they are added.
    pub fn add_pipeline<P>(mut self, pipeline: P) -> Self
    where
        P: Pipeline<S::Item> + 'static,
    {
        self.item_pipelines.register(pipeline);
        self
    }

    /// Registers an observer for failures and the final summary.
    pub fn observe_with(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observers.register(observer);
        self
    }

    /// Builds the `Crawler`, validating the seed configuration.
    pub fn build(mut self) -> Result<Crawler<S, F>, SpiderError> {
        let seeds = self.validate_and_get_seeds()?;

        if self.item_pipelines.is_empty() {
            debug!("No item pipelines registered, using the console writer");
            self.item_pipelines.register(ConsoleWriterPipeline::new());
        }
        if self.observers.is_empty() {
            self.observers.register(Arc::new(LogObserver));
        }

        Ok(Crawler::new(
            seeds,
            self.fetcher,
            self.spider,
            self.item_pipelines,
            self.observers,
            self.crawler_config,
        ))
    }

    fn validate_and_get_seeds(&self) -> Result<Vec<Request>, SpiderError> {
        let seeds = if self.seeds.is_empty() {
            self.spider.start_requests().map_err(|e| {
                SpiderError::ConfigurationError(format!("Invalid start URL: {e}"))
            })?
        } else {
            self.seeds
                .iter()
                .map(|url| {
                    Request::parse(url).map_err(|e| {
                        SpiderError::ConfigurationError(format!("Invalid seed URL '{url}': {e}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        if let Some(seed) = seeds
            .iter()
            .find(|seed| !matches!(seed.url.scheme(), "http" | "https"))
        {
            return Err(SpiderError::ConfigurationError(format!(
                "Seed URL must be http(s): {}",
                seed.url
            )));
        }
        if seeds.is_empty() {
            return Err(SpiderError::ConfigurationError(
                "Crawler must have a seed URL or a spider with start URLs.".to_string(),
            ));
        }
        Ok(seeds)
    }
}
