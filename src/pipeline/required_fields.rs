use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::Pipeline;
use crate::crawler::CrawlHandle;
use crate::error::PipelineError;
use crate::item::Record;

/// Field added to records that lack required data.
pub const DEFAULT_TAG_FIELD: &str = "_missing";

/// Tags records that are missing required fields and passes them on.
///
/// A field is missing when it is absent or `null`. The names of the missing
/// fields are written, in declaration order, as a JSON array under the tag
/// field. Records are never dropped.
#[derive(Debug, Clone)]
pub struct RequiredFieldsPipeline {
    required: Vec<String>,
    tag_field: String,
}

impl RequiredFieldsPipeline {
    pub fn new<K, F>(required: K) -> Self
    where
        K: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            tag_field: DEFAULT_TAG_FIELD.to_string(),
        }
    }

    /// Uses `field` instead of [`DEFAULT_TAG_FIELD`].
    pub fn tag_field(mut self, field: impl Into<String>) -> Self {
        self.tag_field = field.into();
        self
    }
}

#[async_trait]
impl Pipeline<Record> for RequiredFieldsPipeline {
    fn name(&self) -> &str {
        "required_fields"
    }

    async fn process_item(
        &self,
        mut item: Record,
        crawl: &mut CrawlHandle<'_>,
    ) -> Result<Option<Record>, PipelineError> {
        let missing: Vec<Value> = self
            .required
            .iter()
            .filter(|field| !item.is_present(field))
            .map(|field| Value::String(field.clone()))
            .collect();

        if !missing.is_empty() {
            debug!(
                "Record from {} is missing {} required field(s)",
                crawl.base_url(),
                missing.len()
            );
            item.insert(self.tag_field.clone(), Value::Array(missing));
        }
        Ok(Some(item))
    }
}
