//! # Crawler Module
//!
//! Implements the crawl driver.
//!
//! ## Overview
//!
//! The crawler module provides the main `Crawler` struct and the components
//! it uses for each task it takes off the queue: fetching the request,
//! handing a successful response to the spider, and feeding the spider's
//! items through the registered pipeline stages.
//!
//! ## Key Components
//!
//! - **Crawler**: owns the scheduler, fetcher, spider and pipeline for one run
//! - **CrawlHandle**: the view of the crawler given to spiders and stages
//! - **ItemPipeline**: the ordered list of pipeline stages
//!
//! ## Execution model
//!
//! One task is fetched, parsed and piped to completion before the next one is
//! dequeued. There is no concurrency between tasks, so the queue and the
//! visited set need no synchronization.

mod core;
mod handle;
mod item_processor;
mod request_handler;
mod response_parser;

pub use core::Crawler;
pub use handle::CrawlHandle;
pub(crate) use handle::admit_request;
#[cfg(test)]
pub(crate) use handle::HandleFixture;
pub use item_processor::ItemPipeline;
pub(crate) use request_handler::fetch_request;
pub(crate) use response_parser::parse_response;
