use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::crawler::CrawlHandle;
use crate::error::SpiderError;
use crate::item::Record;
use crate::response::Response;
use crate::spider::{Records, Spider};

/// One field of a listing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// CSS selector, evaluated inside the record element.
    pub selector: String,
    /// Attribute to read. `None` reads the element's text.
    #[serde(default)]
    pub attr: Option<String>,
    /// Value used when the selector matches nothing or yields an empty
    /// string. JSON `null` unless set.
    #[serde(default)]
    pub default: Value,
}

impl FieldSpec {
    pub fn text(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            attr: None,
            default: Value::Null,
        }
    }

    pub fn attr(
        name: impl Into<String>,
        selector: impl Into<String>,
        attr: impl Into<String>,
    ) -> Self {
        Self {
            attr: Some(attr.into()),
            ..Self::text(name, selector)
        }
    }

    pub fn or_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }
}

/// Describes a paginated listing: where the records are, what fields they
/// have and how to find the next page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub name: Option<String>,
    pub start_urls: Vec<String>,
    pub record_selector: String,
    pub fields: Vec<FieldSpec>,
    /// Selector for the "next page" link. Its `href` is followed.
    pub next_selector: Option<String>,
}

impl ListingConfig {
    pub fn new(record_selector: impl Into<String>) -> Self {
        Self {
            record_selector: record_selector.into(),
            ..Self::default()
        }
    }

    pub fn start_url(mut self, url: impl Into<String>) -> Self {
        self.start_urls.push(url.into());
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn next_page(mut self, selector: impl Into<String>) -> Self {
        self.next_selector = Some(selector.into());
        self
    }
}

/// A spider for listing pages, driven entirely by CSS selectors.
///
/// Each element matched by the record selector becomes one [`Record`] with
/// one entry per configured field. A field that cannot be found is set to its
/// default, so a partially filled record never fails the page. When the page
/// has no next link the branch ends silently; a next link whose `href`
/// cannot be resolved is reported as an extraction failure and the page's
/// records are still produced.
///
/// Extraction is eager per page: all records are collected before `parse`
/// returns, since the parsed HTML tree cannot be held across the crawl.
#[derive(Debug)]
pub struct ListingSpider {
    name: String,
    start_urls: Vec<String>,
    record_selector: Selector,
    fields: Vec<(FieldSpec, Selector)>,
    next_selector: Option<Selector>,
}

fn compile(selector: &str) -> Result<Selector, SpiderError> {
    Selector::parse(selector).map_err(|e| {
        SpiderError::ConfigurationError(format!("Invalid CSS selector '{selector}': {e}"))
    })
}

impl ListingSpider {
    pub fn new(config: ListingConfig) -> Result<Self, SpiderError> {
        let fields = config
            .fields
            .into_iter()
            .map(|field| {
                let selector = compile(&field.selector)?;
                Ok((field, selector))
            })
            .collect::<Result<Vec<_>, SpiderError>>()?;

        Ok(Self {
            name: config.name.unwrap_or_else(|| "listing".to_string()),
            start_urls: config.start_urls,
            record_selector: compile(&config.record_selector)?,
            fields,
            next_selector: config.next_selector.as_deref().map(compile).transpose()?,
        })
    }

    fn extract_record(&self, element: ElementRef<'_>) -> Record {
        self.fields
            .iter()
            .map(|(spec, selector)| {
                let value = element
                    .select(selector)
                    .next()
                    .and_then(|found| read_value(found, spec.attr.as_deref()))
                    .map(Value::String)
                    .unwrap_or_else(|| spec.default.clone());
                (spec.name.clone(), value)
            })
            .collect()
    }

    fn follow_next(&self, document: &Html, crawl: &mut CrawlHandle<'_>) {
        let Some(selector) = &self.next_selector else {
            return;
        };
        let Some(href) = document
            .select(selector)
            .next()
            .and_then(|link| link.value().attr("href"))
        else {
            trace!("No next page link on {}", crawl.base_url());
            return;
        };

        match crawl.schedule(href.trim()) {
            Ok(true) => debug!("Scheduled next page {}", href),
            Ok(false) => trace!("Next page {} already seen or out of scope", href),
            Err(e) => crawl.report(format!("Unusable next page link '{href}': {e}")),
        }
    }
}

fn read_value(element: ElementRef<'_>, attr: Option<&str>) -> Option<String> {
    let raw = match attr {
        Some(attr) => element.value().attr(attr)?.trim().to_string(),
        None => element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "),
    };
    (!raw.is_empty()).then_some(raw)
}

impl Spider for ListingSpider {
    type Item = Record;

    fn name(&self) -> &str {
        &self.name
    }

    fn start_urls(&self) -> Vec<&str> {
        self.start_urls.iter().map(String::as_str).collect()
    }

    fn parse<'a>(
        &'a mut self,
        response: &'a Response,
        crawl: &mut CrawlHandle<'_>,
    ) -> Result<Records<'a, Record>, SpiderError> {
        let document = Html::parse_document(&response.text());
        let records: Vec<Record> = document
            .select(&self.record_selector)
            .map(|element| self.extract_record(element))
            .collect();
        debug!("Extracted {} records from {}", records.len(), response.url);

        self.follow_next(&document, crawl);
        Ok(Box::new(records.into_iter()))
    }
}
