//! A "prelude" for users of the `spiderline` crate.
//!
//! This prelude re-exports the most commonly used traits and structs so that
//! they can be easily imported.
//!
//! # Example
//!
//! ```
//! use spiderline::prelude::*;
//! ```

pub use crate::{
    // Core structs
    CrawlHandle,
    CrawlOrder,
    CrawlSummary,
    Crawler,
    CrawlerBuilder,
    Record,
    Records,
    Request,
    Response,
    // Core traits
    CrawlObserver,
    Fetcher,
    ScrapedItem,
    Spider,
    // Essential re-exports for trait implementation
    async_trait,
    // Errors
    FetchError,
    PipelineError,
    SpiderError,
};

pub use crate::pipeline::{
    ConsoleWriterPipeline, DeduplicationPipeline, JsonLinesWriterPipeline, Pipeline,
    RequiredFieldsPipeline,
};
