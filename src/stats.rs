//! # Statistics Module
//!
//! Collects metrics about a crawl run and produces the end-of-run
//! [`CrawlSummary`].
//!
//! ## Key Metrics Tracked
//!
//! - **Requests**: enqueued, sent, succeeded (2xx), failed at transport level,
//!   skipped by the depth limit
//! - **Responses**: received, non-2xx, status code distribution, bytes
//! - **Pages**: responses whose parse failed
//! - **Items**: scraped by the spider, processed by every stage, dropped by a stage
//! - **Stages**: cumulative processing time per pipeline stage
//!
//! ## Example
//!
//! ```rust,ignore
//! let crawler = CrawlerBuilder::new(MySpider).seed("https://example.com").build()?;
//! let stats = crawler.get_stats();
//! let summary = crawler.run().await?;
//! println!("{}", stats.to_markdown_string());
//! ```

use dashmap::DashMap;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use crate::error::SpiderError;

/// End-of-run report: counters plus the visited URLs in visit order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlSummary {
    pub requests_enqueued: usize,
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_skipped: usize,
    pub responses_received: usize,
    pub responses_non_success: usize,
    pub total_bytes_downloaded: usize,
    pub pages_parse_failed: usize,
    pub items_scraped: usize,
    pub items_processed: usize,
    pub items_dropped_by_pipeline: usize,
    pub response_status_counts: BTreeMap<u16, usize>,
    pub elapsed_ms: u128,
    pub visited: Vec<String>,
}

impl CrawlSummary {
    /// Failures of any kind reported during the run.
    pub fn failures(&self) -> usize {
        self.requests_failed + self.responses_non_success + self.pages_parse_failed
    }

    fn formatted_bytes(&self) -> String {
        const KB: usize = 1024;
        const MB: usize = 1024 * KB;
        const GB: usize = 1024 * MB;

        if self.total_bytes_downloaded >= GB {
            format!("{:.2} GB", self.total_bytes_downloaded as f64 / GB as f64)
        } else if self.total_bytes_downloaded >= MB {
            format!("{:.2} MB", self.total_bytes_downloaded as f64 / MB as f64)
        } else if self.total_bytes_downloaded >= KB {
            format!("{:.2} KB", self.total_bytes_downloaded as f64 / KB as f64)
        } else {
            format!("{} B", self.total_bytes_downloaded)
        }
    }

    fn items_per_second(&self) -> f64 {
        let total_seconds = self.elapsed_ms as f64 / 1000.0;
        if total_seconds > 0.0 {
            self.items_scraped as f64 / total_seconds
        } else {
            0.0
        }
    }
}

/// Collects and stores statistics about the crawler's operation.
#[derive(Debug)]
pub struct StatCollector {
    start_time: Instant,

    requests_enqueued: AtomicUsize,
    requests_sent: AtomicUsize,
    requests_succeeded: AtomicUsize,
    requests_failed: AtomicUsize,
    requests_skipped: AtomicUsize,

    responses_received: AtomicUsize,
    responses_non_success: AtomicUsize,
    response_status_counts: DashMap<u16, usize>,
    total_bytes_downloaded: AtomicUsize,

    pages_parse_failed: AtomicUsize,

    items_scraped: AtomicUsize,
    items_processed: AtomicUsize,
    items_dropped_by_pipeline: AtomicUsize,

    // stage name -> (total time, invocations)
    pipeline_times: DashMap<String, (Duration, usize)>,
}

impl StatCollector {
    pub(crate) fn new() -> Self {
        StatCollector {
            start_time: Instant::now(),
            requests_enqueued: AtomicUsize::new(0),
            requests_sent: AtomicUsize::new(0),
            requests_succeeded: AtomicUsize::new(0),
            requests_failed: AtomicUsize::new(0),
            requests_skipped: AtomicUsize::new(0),
            responses_received: AtomicUsize::new(0),
            responses_non_success: AtomicUsize::new(0),
            response_status_counts: DashMap::new(),
            total_bytes_downloaded: AtomicUsize::new(0),
            pages_parse_failed: AtomicUsize::new(0),
            items_scraped: AtomicUsize::new(0),
            items_processed: AtomicUsize::new(0),
            items_dropped_by_pipeline: AtomicUsize::new(0),
            pipeline_times: DashMap::new(),
        }
    }

    pub(crate) fn increment_requests_enqueued(&self) {
        self.requests_enqueued.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_requests_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_requests_succeeded(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_requests_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_requests_skipped(&self) {
        self.requests_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_responses_non_success(&self) {
        self.responses_non_success.fetch_add(1, Ordering::SeqCst);
    }

    /// Records a received response's status and size.
    pub(crate) fn record_response(&self, status_code: u16, bytes: usize) {
        self.responses_received.fetch_add(1, Ordering::SeqCst);
        *self.response_status_counts.entry(status_code).or_insert(0) += 1;
        self.total_bytes_downloaded.fetch_add(bytes, Ordering::SeqCst);
    }

    pub(crate) fn increment_pages_parse_failed(&self) {
        self.pages_parse_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_items_scraped(&self) {
        self.items_scraped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_items_processed(&self) {
        self.items_processed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_items_dropped_by_pipeline(&self) {
        self.items_dropped_by_pipeline.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_pipeline_time(&self, stage: &str, elapsed: Duration) {
        let mut entry = self
            .pipeline_times
            .entry(stage.to_string())
            .or_insert((Duration::ZERO, 0));
        entry.0 += elapsed;
        entry.1 += 1;
    }

    pub fn items_scraped(&self) -> usize {
        self.items_scraped.load(Ordering::SeqCst)
    }

    pub fn items_processed(&self) -> usize {
        self.items_processed.load(Ordering::SeqCst)
    }

    /// How many times a stage ran and its cumulative processing time.
    pub fn pipeline_time(&self, stage: &str) -> Option<(Duration, usize)> {
        self.pipeline_times.get(stage).map(|entry| *entry.value())
    }

    /// Takes a consistent snapshot of every counter.
    pub fn summary(&self, visited: &[String]) -> CrawlSummary {
        CrawlSummary {
            requests_enqueued: self.requests_enqueued.load(Ordering::SeqCst),
            requests_sent: self.requests_sent.load(Ordering::SeqCst),
            requests_succeeded: self.requests_succeeded.load(Ordering::SeqCst),
            requests_failed: self.requests_failed.load(Ordering::SeqCst),
            requests_skipped: self.requests_skipped.load(Ordering::SeqCst),
            responses_received: self.responses_received.load(Ordering::SeqCst),
            responses_non_success: self.responses_non_success.load(Ordering::SeqCst),
            total_bytes_downloaded: self.total_bytes_downloaded.load(Ordering::SeqCst),
            pages_parse_failed: self.pages_parse_failed.load(Ordering::SeqCst),
            items_scraped: self.items_scraped.load(Ordering::SeqCst),
            items_processed: self.items_processed.load(Ordering::SeqCst),
            items_dropped_by_pipeline: self.items_dropped_by_pipeline.load(Ordering::SeqCst),
            response_status_counts: self
                .response_status_counts
                .iter()
                .map(|entry| (*entry.key(), *entry.value()))
                .collect(),
            elapsed_ms: self.start_time.elapsed().as_millis(),
            visited: visited.to_vec(),
        }
    }

    pub fn to_json_string(&self) -> Result<String, SpiderError> {
        Ok(serde_json::to_string(&self.summary(&[]))?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, SpiderError> {
        Ok(serde_json::to_string_pretty(&self.summary(&[]))?)
    }

    /// Exports the current statistics to a Markdown formatted string.
    pub fn to_markdown_string(&self) -> String {
        let snapshot = self.summary(&[]);

        let status_codes_list: String = snapshot
            .response_status_counts
            .iter()
            .map(|(code, count)| format!("- **{}**: {}", code, count))
            .collect::<Vec<String>>()
            .join("\n");
        let status_codes_output = if status_codes_list.is_empty() {
            "N/A".to_string()
        } else {
            status_codes_list
        };

        let mut stages: Vec<(String, Duration, usize)> = self
            .pipeline_times
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().0, entry.value().1))
            .collect();
        stages.sort_by(|a, b| a.0.cmp(&b.0));
        let stages_output = if stages.is_empty() {
            "N/A".to_string()
        } else {
            stages
                .iter()
                .map(|(name, total, count)| format!("- **{}**: {} items, {:?}", name, count, total))
                .collect::<Vec<String>>()
                .join("\n")
        };

        format!(
            r#"# Crawl Statistics Report

- **Duration**: {} ms
- **Average Speed**: {:.2} item/s

## Requests
| Metric     | Count |
|------------|-------|
| Enqueued   | {}     |
| Sent       | {}     |
| Succeeded  | {}     |
| Failed     | {}     |
| Skipped    | {}     |

## Responses
| Metric      | Count |
|-------------|-------|
| Received    | {}     |
| Non-success | {}     |
| Downloaded  | {}     |

## Items
| Metric     | Count |
|------------|-------|
| Scraped    | {}     |
| Processed  | {}     |
| Dropped    | {}     |

## Status Codes
{}

## Pipeline Stages
{}
"#,
            snapshot.elapsed_ms,
            snapshot.items_per_second(),
            snapshot.requests_enqueued,
            snapshot.requests_sent,
            snapshot.requests_succeeded,
            snapshot.requests_failed,
            snapshot.requests_skipped,
            snapshot.responses_received,
            snapshot.responses_non_success,
            snapshot.formatted_bytes(),
            snapshot.items_scraped,
            snapshot.items_processed,
            snapshot.items_dropped_by_pipeline,
            status_codes_output,
            stages_output
        )
    }
}

impl Default for StatCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StatCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.summary(&[]);

        writeln!(f, "\nCrawl Statistics")?;
        writeln!(f, "----------------")?;
        writeln!(f, "  duration : {} ms", snapshot.elapsed_ms)?;
        writeln!(
            f,
            "  requests : enqueued: {}, sent: {}, ok: {}, fail: {}, skip: {}",
            snapshot.requests_enqueued,
            snapshot.requests_sent,
            snapshot.requests_succeeded,
            snapshot.requests_failed,
            snapshot.requests_skipped
        )?;
        writeln!(
            f,
            "  response : received: {}, non-2xx: {}, downloaded: {}",
            snapshot.responses_received,
            snapshot.responses_non_success,
            snapshot.formatted_bytes()
        )?;
        writeln!(
            f,
            "  items    : scraped: {}, processed: {}, dropped: {}",
            snapshot.items_scraped, snapshot.items_processed, snapshot.items_dropped_by_pipeline
        )?;

        let status_string = if snapshot.response_status_counts.is_empty() {
            "none".to_string()
        } else {
            snapshot
                .response_status_counts
                .iter()
                .map(|(code, count)| format!("{}: {}", code, count))
                .collect::<Vec<String>>()
                .join(", ")
        };

        writeln!(f, "  status   : {}\n", status_string)
    }
}
