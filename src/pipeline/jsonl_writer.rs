use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::Pipeline;
use crate::crawler::CrawlHandle;
use crate::error::PipelineError;
use crate::item::ScrapedItem;

/// Appends every item as one line of JSON to a file and passes it on.
///
/// Write failures are returned as errors and therefore halt the crawl. The
/// buffer is flushed on close.
#[derive(Debug)]
pub struct JsonLinesWriterPipeline {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    written: AtomicUsize,
}

impl JsonLinesWriterPipeline {
    /// Creates (or truncates) the output file.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        debug!("Writing items to {:?}", path);
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            written: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of items written so far.
    pub fn written(&self) -> usize {
        self.written.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<I: ScrapedItem> Pipeline<I> for JsonLinesWriterPipeline {
    fn name(&self) -> &str {
        "jsonl_writer"
    }

    async fn process_item(
        &self,
        item: I,
        _crawl: &mut CrawlHandle<'_>,
    ) -> Result<Option<I>, PipelineError> {
        let mut line = serde_json::to_vec(&item)?;
        line.push(b'\n');
        self.writer.lock().await.write_all(&line).await?;
        self.written.fetch_add(1, Ordering::SeqCst);
        Ok(Some(item))
    }

    async fn close(&self) -> Result<(), PipelineError> {
        self.writer.lock().await.flush().await?;
        info!("Wrote {} items to {:?}", self.written(), self.path);
        Ok(())
    }
}
