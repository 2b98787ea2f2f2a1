//! # spiderline
//!
//! A single-run web crawler engine.
//!
//! Provides the main components: `Crawler`, `Scheduler`, the `Spider` and
//! `Fetcher` traits, the item `Pipeline` trait with built-in stages, and the
//! statistics and observer infrastructure around them.
//!
//! A crawl starts from a seed URL. Each URL is fetched once; successful
//! responses are handed to the spider, which yields records and may schedule
//! further URLs. Every record is fed through the pipeline stages in
//! registration order. The run ends when the queue is empty.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spiderline::prelude::*;
//! use spiderline::spiders::{FieldSpec, ListingConfig, ListingSpider};
//!
//! async fn run_crawler() -> Result<CrawlSummary, SpiderError> {
//!     let spider = ListingSpider::new(
//!         ListingConfig::new("li.item")
//!             .field(FieldSpec::text("title", "a.title"))
//!             .next_page("a.next"),
//!     )?;
//!
//!     let crawler = CrawlerBuilder::new(spider)
//!         .seed("https://example.test/page1")
//!         .add_pipeline(RequiredFieldsPipeline::new(["title"]))
//!         .build()?;
//!     crawler.run().await
//! }
//! ```

pub mod builder;
pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod item;
pub mod observer;
pub mod pipeline;
pub mod prelude;
pub mod request;
pub mod response;
pub mod scheduler;
pub mod spider;
pub mod spiders;
pub mod stats;

pub use builder::{CrawlerBuilder, CrawlerConfig};
pub use crawler::{CrawlHandle, Crawler, ItemPipeline};
pub use error::{FetchError, PipelineError, SpiderError};
pub use fetcher::{Fetcher, FetcherConfig, ReqwestFetcher};
pub use item::{Record, ScrapedItem};
pub use observer::{CrawlFailure, CrawlObserver, FailureKind, LogObserver, ObserverRegistry};
pub use request::Request;
pub use response::Response;
pub use scheduler::{CrawlOrder, Scheduler};
pub use spider::{Records, Spider};
pub use stats::{CrawlSummary, StatCollector};

pub use async_trait::async_trait;
pub use tokio;
