use async_trait::async_trait;
use tracing::trace;

use super::Pipeline;
use crate::crawler::CrawlHandle;
use crate::error::PipelineError;
use crate::item::ScrapedItem;

/// Prints every item to stdout as one line of JSON and passes it on.
///
/// Installed by default when no stage is registered.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleWriterPipeline;

impl ConsoleWriterPipeline {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<I: ScrapedItem> Pipeline<I> for ConsoleWriterPipeline {
    fn name(&self) -> &str {
        "console_writer"
    }

    async fn process_item(
        &self,
        item: I,
        crawl: &mut CrawlHandle<'_>,
    ) -> Result<Option<I>, PipelineError> {
        let line = serde_json::to_string(&item)?;
        trace!("Writing item scraped from {}", crawl.base_url());
        println!("{line}");
        Ok(Some(item))
    }
}
