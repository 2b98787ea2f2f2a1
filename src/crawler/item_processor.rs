//! Runs scraped items through the registered pipeline stages.

use std::time::Instant;
use tracing::{debug, error, trace};

use super::CrawlHandle;
use crate::error::PipelineError;
use crate::item::ScrapedItem;
use crate::pipeline::Pipeline;

/// An ordered list of stages. The order is fixed once the crawler is built.
pub struct ItemPipeline<I: ScrapedItem> {
    stages: Vec<Box<dyn Pipeline<I>>>,
}

impl<I: ScrapedItem> ItemPipeline<I> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage. Stages run in registration order.
    pub fn register<P>(&mut self, stage: P)
    where
        P: Pipeline<I> + 'static,
    {
        self.stages.push(Box::new(stage));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Feeds one item through every stage in order.
    ///
    /// A stage returning `Ok(None)` ends processing of this item. A stage
    /// error is returned unchanged; the caller decides whether it is fatal.
    pub async fn submit(&self, item: I, crawl: &mut CrawlHandle<'_>) -> Result<(), PipelineError> {
        trace!("Processing item through {} pipelines", self.stages.len());

        let mut current = item;
        for (idx, stage) in self.stages.iter().enumerate() {
            trace!(
                "Processing item through pipeline '{}' ({} of {})",
                stage.name(),
                idx + 1,
                self.stages.len()
            );

            let start_time = Instant::now();
            let result = stage.process_item(current, crawl).await;
            crawl.stats().record_pipeline_time(stage.name(), start_time.elapsed());

            match result {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    debug!("Pipeline '{}' dropped item", stage.name());
                    crawl.stats().increment_items_dropped_by_pipeline();
                    return Ok(());
                }
                Err(e) => {
                    error!("Pipeline '{}' error: {}", stage.name(), e);
                    return Err(e);
                }
            }
        }

        trace!("Item successfully processed by all pipelines");
        crawl.stats().increment_items_processed();
        Ok(())
    }

    /// Closes every stage, even if an earlier one fails; returns the first
    /// error.
    pub async fn close(&self) -> Result<(), PipelineError> {
        let mut first_error = None;
        for stage in &self.stages {
            if let Err(e) = stage.close().await {
                error!("Failed to close pipeline '{}': {}", stage.name(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("All item pipelines closed");
                Ok(())
            }
        }
    }
}

impl<I: ScrapedItem> Default for ItemPipeline<I> {
    fn default() -> Self {
        Self::new()
    }
}
