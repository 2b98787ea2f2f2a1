use async_trait::async_trait;
use dashmap::DashSet;
use serde_json::Value;
use tracing::debug;

use super::Pipeline;
use crate::crawler::CrawlHandle;
use crate::error::PipelineError;
use crate::item::ScrapedItem;

static NULL: Value = Value::Null;

/// Drops an item when the values of its key fields were already seen in
/// this run.
///
/// Items are compared through their JSON form. An item that has none of the
/// key fields (or only `null` ones) cannot be keyed and is passed on.
#[derive(Debug)]
pub struct DeduplicationPipeline {
    key_fields: Vec<String>,
    seen: DashSet<String>,
}

impl DeduplicationPipeline {
    pub fn new<K, F>(key_fields: K) -> Self
    where
        K: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            key_fields: key_fields.into_iter().map(Into::into).collect(),
            seen: DashSet::new(),
        }
    }

    /// Number of distinct keys seen so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    fn key_of(&self, value: &Value) -> Option<String> {
        let parts: Vec<&Value> = self
            .key_fields
            .iter()
            .map(|field| value.get(field).unwrap_or(&NULL))
            .collect();
        if parts.iter().all(|v| v.is_null()) {
            return None;
        }
        serde_json::to_string(&parts).ok()
    }
}

#[async_trait]
impl<I: ScrapedItem> Pipeline<I> for DeduplicationPipeline {
    fn name(&self) -> &str {
        "deduplication"
    }

    async fn process_item(
        &self,
        item: I,
        _crawl: &mut CrawlHandle<'_>,
    ) -> Result<Option<I>, PipelineError> {
        let value = serde_json::to_value(&item)?;
        let Some(key) = self.key_of(&value) else {
            return Ok(Some(item));
        };
        if self.seen.insert(key.clone()) {
            Ok(Some(item))
        } else {
            debug!("Dropping duplicate item with key {}", key);
            Ok(None)
        }
    }
}
