//! Hands a successful response to the spider and forwards what it yields.
//!
//! Items are consumed from the spider's sequence one at a time and each is
//! run through the whole pipeline before the next is pulled, so pipeline
//! order matches extraction order. A spider error is an extraction failure for
//! this page only: it is reported and the crawl moves on. A pipeline error is
//! returned to the crawler, which halts.

use tracing::{debug, error, info, trace};

use super::{CrawlHandle, ItemPipeline};
use crate::error::PipelineError;
use crate::observer::CrawlFailure;
use crate::response::Response;
use crate::spider::Spider;

pub(crate) async fn parse_response<S: Spider>(
    spider: &mut S,
    response: &Response,
    crawl: &mut CrawlHandle<'_>,
    pipeline: &ItemPipeline<S::Item>,
) -> Result<(), PipelineError> {
    debug!("Parsing response from {}", response.url);

    let spider_name = spider.name().to_owned();
    let items = match spider.parse(response, crawl) {
        Ok(items) => items,
        Err(e) => {
            error!("Spider '{}' failed to parse {}: {}", spider_name, response.url, e);
            crawl.stats().increment_pages_parse_failed();
            crawl
                .observers()
                .notify_failure(&CrawlFailure::extraction(response.url.clone(), e.to_string()));
            return Ok(());
        }
    };

    let mut items_len = 0;
    for item in items {
        items_len += 1;
        trace!("Processing item {} from {}", items_len, response.url);
        crawl.stats().increment_items_scraped();
        pipeline.submit(item, crawl).await?;
    }

    if items_len > 0 || crawl.scheduled() > 0 {
        info!(
            "Processed {} items and scheduled {} requests from {}",
            items_len,
            crawl.scheduled(),
            response.url
        );
    } else {
        trace!("Spider output for {} contained no requests or items", response.url);
    }
    Ok(())
}
