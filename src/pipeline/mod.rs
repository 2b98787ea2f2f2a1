//! # Pipeline Module
//!
//! The `Pipeline` trait and the built-in stages.
//!
//! Every item a spider yields is fed through the registered stages in
//! registration order. Each stage receives the previous stage's output and
//! returns the (possibly transformed) item:
//!
//! - `Ok(Some(item))` passes the item on.
//! - `Ok(None)` drops it. Only stages whose documented contract is to drop
//!   on some condition should do this; no later stage sees a dropped item.
//! - `Err(_)` halts the crawl. Stages that can recover from bad data should
//!   tag the item and pass it on instead.
//!
//! ## Built-in stages
//!
//! - [`ConsoleWriterPipeline`]: prints each item as a JSON line.
//! - [`DeduplicationPipeline`]: drops items whose key fields were seen before.
//! - [`RequiredFieldsPipeline`]: tags records missing required fields.
//! - [`JsonLinesWriterPipeline`]: persists items to a JSON-lines file.

use async_trait::async_trait;

use crate::crawler::CrawlHandle;
use crate::error::PipelineError;
use crate::item::ScrapedItem;

mod console_writer;
mod deduplication;
mod jsonl_writer;
mod required_fields;

pub use console_writer::ConsoleWriterPipeline;
pub use deduplication::DeduplicationPipeline;
pub use jsonl_writer::JsonLinesWriterPipeline;
pub use required_fields::RequiredFieldsPipeline;

/// One stage of item processing.
#[async_trait]
pub trait Pipeline<I: ScrapedItem>: Send + Sync + 'static {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Processes a single item.
    ///
    /// The crawl handle gives access to the current page and lets a stage
    /// schedule further URLs.
    async fn process_item(
        &self,
        item: I,
        crawl: &mut CrawlHandle<'_>,
    ) -> Result<Option<I>, PipelineError>;

    /// Called once when the crawl ends, whether it completed or halted.
    async fn close(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}
