//! # Spider Module
//!
//! Defines the `Spider` trait, the extractor that turns a fetched response
//! into scraped items and follow-up URLs.
//!
//! ## Overview
//!
//! A spider is handed every successful (2xx) response together with a
//! [`CrawlHandle`]. It returns a lazy sequence of items for that response and
//! may call [`CrawlHandle::schedule`] any number of times to queue further
//! pages. A spider that schedules nothing ends its branch of the crawl; that is
//! how pagination naturally terminates when a page has no "next" link.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spiderline::{CrawlHandle, Record, Records, Response, Spider, SpiderError};
//!
//! struct TitleSpider;
//!
//! impl Spider for TitleSpider {
//!     type Item = Record;
//!
//!     fn parse<'a>(
//!         &'a mut self,
//!         response: &'a Response,
//!         crawl: &mut CrawlHandle<'_>,
//!     ) -> Result<Records<'a, Record>, SpiderError> {
//!         crawl.schedule("/next")?;
//!         let text = response.text().into_owned();
//!         Ok(Box::new(std::iter::once(Record::new().with("body", text))))
//!     }
//! }
//! ```

use crate::crawler::CrawlHandle;
use crate::error::SpiderError;
use crate::item::ScrapedItem;
use crate::request::Request;
use crate::response::Response;

/// The items a spider yields for one response: finite, consumed once, in order.
pub type Records<'a, I> = Box<dyn Iterator<Item = I> + Send + 'a>;

/// Defines the contract for a web spider.
pub trait Spider: Send + 'static {
    /// The type of item that the spider scrapes.
    type Item: ScrapedItem;

    /// A short name used in logs.
    fn name(&self) -> &str {
        "spider"
    }

    /// Returns the initial URLs, used when the crawler has no configured seed.
    fn start_urls(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Generates the initial requests from [`start_urls`](Self::start_urls).
    fn start_requests(&self) -> Result<Vec<Request>, SpiderError> {
        self.start_urls()
            .into_iter()
            .map(|url| Request::parse(url).map_err(SpiderError::from))
            .collect()
    }

    /// Parses a successful response.
    ///
    /// Missing optional data must not fail the whole page; substitute a
    /// sentinel instead. Returning `Err` is reported as an extraction failure
    /// for this page and the crawl moves on.
    fn parse<'a>(
        &'a mut self,
        response: &'a Response,
        crawl: &mut CrawlHandle<'_>,
    ) -> Result<Records<'a, Self::Item>, SpiderError>;
}
