//! End-to-end crawls against an in-memory site.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use spiderline::prelude::*;
use spiderline::{CrawlFailure, FailureKind};
use url::Url;

/// One page of the fake site.
#[derive(Clone)]
enum Page {
    Listing { ids: Vec<i64>, links: Vec<&'static str> },
    Status(u16),
    Redirect(&'static str),
    Garbage,
}

/// Serves pages from a map and records every URL it was asked for.
struct MemoryFetcher {
    pages: HashMap<String, Page>,
    fetched: Arc<Mutex<Vec<String>>>,
    opened: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl MemoryFetcher {
    fn new(pages: Vec<(&str, Page)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(url, page)| (url.to_string(), page))
                .collect(),
            fetched: Arc::default(),
            opened: Arc::default(),
            closed: Arc::default(),
        }
    }

    fn serve(&self, request: &Request, url: &str) -> Result<Response, FetchError> {
        match self.pages.get(url) {
            Some(Page::Listing { ids, links }) => {
                let body = serde_json::json!({ "ids": ids, "links": links }).to_string();
                Ok(Response::new(request.clone(), StatusCode::OK, body))
            }
            Some(Page::Garbage) => Ok(Response::new(request.clone(), StatusCode::OK, "not json")),
            Some(Page::Status(code)) => Ok(Response::new(
                request.clone(),
                StatusCode::from_u16(*code).unwrap(),
                "",
            )),
            Some(Page::Redirect(target)) => {
                let final_url = Url::parse(target).unwrap();
                Ok(self.serve(request, target)?.with_url(final_url))
            }
            None => Err(FetchError::Transport(format!("connection refused: {url}"))),
        }
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn open(&mut self) -> Result<(), FetchError> {
        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        assert!(self.opened.load(Ordering::SeqCst), "fetch before open");
        self.fetched.lock().unwrap().push(request.url.to_string());
        self.serve(request, request.url.as_str())
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Reads `{"ids": [..], "links": [..]}` bodies: one record per id, one
/// scheduled URL per link.
struct JsonSpider;

impl Spider for JsonSpider {
    type Item = Record;

    fn parse<'a>(
        &'a mut self,
        response: &'a Response,
        crawl: &mut CrawlHandle<'_>,
    ) -> Result<Records<'a, Record>, SpiderError> {
        let body: serde_json::Value = serde_json::from_slice(&response.body)?;
        if let Some(links) = body["links"].as_array() {
            for link in links.iter().filter_map(|l| l.as_str()) {
                crawl.schedule(link)?;
            }
        }
        let ids: Vec<i64> = body["ids"]
            .as_array()
            .map(|ids| ids.iter().filter_map(|id| id.as_i64()).collect())
            .unwrap_or_default();
        Ok(Box::new(ids.into_iter().map(|id| Record::new().with("id", id))))
    }
}

/// Collects the ids of the records that reach it.
struct Collect(Arc<Mutex<Vec<i64>>>);

#[async_trait]
impl Pipeline<Record> for Collect {
    fn name(&self) -> &str {
        "collect"
    }

    async fn process_item(
        &self,
        item: Record,
        _crawl: &mut CrawlHandle<'_>,
    ) -> Result<Option<Record>, PipelineError> {
        if let Some(id) = item.get("id").and_then(|id| id.as_i64()) {
            self.0.lock().unwrap().push(id);
        }
        Ok(Some(item))
    }
}

/// Fails on the record with the given id.
struct FailOn {
    id: i64,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Pipeline<Record> for FailOn {
    fn name(&self) -> &str {
        "fail_on"
    }

    async fn process_item(
        &self,
        item: Record,
        _crawl: &mut CrawlHandle<'_>,
    ) -> Result<Option<Record>, PipelineError> {
        if item.get("id").and_then(|id| id.as_i64()) == Some(self.id) {
            return Err(PipelineError::stage("fail_on", format!("rejected record {}", self.id)));
        }
        Ok(Some(item))
    }

    async fn close(&self) -> Result<(), PipelineError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    failures: Mutex<Vec<CrawlFailure>>,
    completed: Mutex<Option<CrawlSummary>>,
}

impl CrawlObserver for Recorder {
    fn on_failure(&self, failure: &CrawlFailure) {
        self.failures.lock().unwrap().push(failure.clone());
    }

    fn on_complete(&self, summary: &CrawlSummary) {
        *self.completed.lock().unwrap() = Some(summary.clone());
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn listing(ids: Vec<i64>, links: Vec<&'static str>) -> Page {
    Page::Listing { ids, links }
}

struct Harness {
    fetched: Arc<Mutex<Vec<String>>>,
    collected: Arc<Mutex<Vec<i64>>>,
    recorder: Arc<Recorder>,
}

fn build_crawler(
    pages: Vec<(&str, Page)>,
    configure: impl FnOnce(
        CrawlerBuilder<JsonSpider, MemoryFetcher>,
    ) -> CrawlerBuilder<JsonSpider, MemoryFetcher>,
) -> (Crawler<JsonSpider, MemoryFetcher>, Harness) {
    init_tracing();
    let fetcher = MemoryFetcher::new(pages);
    let collected = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::new(Recorder::default());
    let harness = Harness {
        fetched: fetcher.fetched.clone(),
        collected: collected.clone(),
        recorder: recorder.clone(),
    };

    let builder = CrawlerBuilder::new(JsonSpider)
        .seed("https://example.test/page1")
        .with_fetcher(fetcher)
        .observe_with(recorder);
    let crawler = configure(builder)
        .add_pipeline(Collect(collected))
        .build()
        .unwrap();
    (crawler, harness)
}

#[tokio::test]
async fn paginated_listing_yields_records_in_order() {
    let (crawler, harness) = build_crawler(
        vec![
            ("https://example.test/page1", listing(vec![1, 2], vec!["page2"])),
            ("https://example.test/page2", listing(vec![3], vec![])),
        ],
        |b| b,
    );

    let summary = crawler.run().await.unwrap();

    assert_eq!(*harness.collected.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(harness.fetched.lock().unwrap().len(), 2);
    assert_eq!(
        summary.visited,
        vec!["https://example.test/page1", "https://example.test/page2"]
    );
    assert_eq!(summary.items_scraped, 3);
    assert_eq!(summary.items_processed, 3);
    assert!(harness.recorder.failures.lock().unwrap().is_empty());
    assert_eq!(*harness.recorder.completed.lock().unwrap(), Some(summary));
}

#[tokio::test]
async fn failing_seed_ends_the_run() {
    let (crawler, harness) = build_crawler(vec![("https://example.test/page1", Page::Status(500))], |b| b);

    let summary = crawler.run().await.unwrap();

    assert!(harness.collected.lock().unwrap().is_empty());
    assert_eq!(harness.fetched.lock().unwrap().len(), 1);
    let failures = harness.recorder.failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Status);
    assert_eq!(failures[0].status, Some(500));
    assert_eq!(summary.responses_non_success, 1);
    assert_eq!(summary.response_status_counts.get(&500), Some(&1));
}

#[tokio::test]
async fn no_url_is_fetched_twice() {
    let (crawler, harness) = build_crawler(
        vec![
            (
                "https://example.test/page1",
                listing(vec![1], vec!["page2", "page1", "page2#reviews", "/page3/"]),
            ),
            ("https://example.test/page2", listing(vec![2], vec!["page1", "page3"])),
            ("https://example.test/page3/", listing(vec![3], vec!["/page2", "/page1"])),
        ],
        |b| b,
    );

    let summary = crawler.run().await.unwrap();

    let mut fetched = harness.fetched.lock().unwrap().clone();
    assert_eq!(fetched.len(), 3);
    fetched.sort();
    fetched.dedup();
    assert_eq!(fetched.len(), 3);
    assert_eq!(summary.requests_sent, 3);
    assert_eq!(summary.items_scraped, harness.collected.lock().unwrap().len());
}

#[tokio::test]
async fn failures_do_not_stop_the_crawl() {
    let (crawler, harness) = build_crawler(
        vec![
            (
                "https://example.test/page1",
                listing(vec![1], vec!["missing", "gone", "broken", "page2"]),
            ),
            ("https://example.test/gone", Page::Status(404)),
            ("https://example.test/broken", Page::Garbage),
            ("https://example.test/page2", listing(vec![2], vec![])),
        ],
        |b| b,
    );

    let summary = crawler.run().await.unwrap();

    let mut collected = harness.collected.lock().unwrap().clone();
    collected.sort();
    assert_eq!(collected, vec![1, 2]);

    let failures = harness.recorder.failures.lock().unwrap();
    let mut kinds: Vec<_> = failures.iter().map(|f| format!("{:?}", f.kind)).collect();
    kinds.sort();
    assert_eq!(kinds, vec!["Extraction", "Status", "Transport"]);
    assert_eq!(summary.failures(), 3);
    assert_eq!(summary.requests_sent, 5);
}

#[tokio::test]
async fn stage_failure_halts_the_run() {
    let closed = Arc::new(AtomicBool::new(false));
    let stage_closed = closed.clone();
    let (crawler, harness) = build_crawler(
        vec![
            ("https://example.test/page1", listing(vec![1, 2, 3], vec!["page2"])),
            ("https://example.test/page2", listing(vec![4], vec![])),
        ],
        move |b| {
            b.add_pipeline(FailOn {
                id: 2,
                closed: stage_closed,
            })
        },
    );
    let result = crawler.run().await;

    assert!(matches!(result, Err(SpiderError::PipelineError(_))));
    assert_eq!(*harness.collected.lock().unwrap(), vec![1]);
    assert_eq!(harness.fetched.lock().unwrap().len(), 1);
    assert!(closed.load(Ordering::SeqCst));
    assert!(harness.recorder.completed.lock().unwrap().is_none());
}

#[tokio::test]
async fn depth_first_is_the_default_order() {
    let site = || {
        vec![
            ("https://example.test/page1", listing(vec![], vec!["a", "b"])),
            ("https://example.test/a", listing(vec![], vec!["a1"])),
            ("https://example.test/b", listing(vec![], vec![])),
            ("https://example.test/a1", listing(vec![], vec![])),
        ]
    };

    let (crawler, harness) = build_crawler(site(), |b| b);
    crawler.run().await.unwrap();
    assert_eq!(
        *harness.fetched.lock().unwrap(),
        vec![
            "https://example.test/page1",
            "https://example.test/b",
            "https://example.test/a",
            "https://example.test/a1",
        ]
    );

    let (crawler, harness) = build_crawler(site(), |b| b.crawl_order(CrawlOrder::BreadthFirst));
    crawler.run().await.unwrap();
    assert_eq!(
        *harness.fetched.lock().unwrap(),
        vec![
            "https://example.test/page1",
            "https://example.test/a",
            "https://example.test/b",
            "https://example.test/a1",
        ]
    );
}

#[tokio::test]
async fn depth_limit_stops_scheduling() {
    let (crawler, harness) = build_crawler(
        vec![
            ("https://example.test/page1", listing(vec![1], vec!["a"])),
            ("https://example.test/a", listing(vec![2], vec!["a1"])),
            ("https://example.test/a1", listing(vec![3], vec![])),
        ],
        |b| b.max_depth(1),
    );

    let summary = crawler.run().await.unwrap();

    assert_eq!(*harness.collected.lock().unwrap(), vec![1, 2]);
    assert_eq!(summary.requests_skipped, 1);
    assert_eq!(summary.visited.len(), 2);
}

#[tokio::test]
async fn redirect_target_is_not_fetched_again() {
    let (crawler, harness) = build_crawler(
        vec![
            ("https://example.test/page1", listing(vec![], vec!["page2", "old"])),
            ("https://example.test/old", Page::Redirect("https://example.test/page2")),
            ("https://example.test/page2", listing(vec![2], vec![])),
        ],
        |b| b,
    );

    let summary = crawler.run().await.unwrap();

    assert_eq!(
        *harness.fetched.lock().unwrap(),
        vec!["https://example.test/page1", "https://example.test/old"]
    );
    assert_eq!(*harness.collected.lock().unwrap(), vec![2]);
    assert!(summary.visited.contains(&"https://example.test/page2".to_string()));
}

#[tokio::test]
async fn redirect_onto_a_visited_page_is_not_parsed_again() {
    let (crawler, harness) = build_crawler(
        vec![
            ("https://example.test/page1", listing(vec![], vec!["old", "page2"])),
            ("https://example.test/old", Page::Redirect("https://example.test/page2")),
            ("https://example.test/page2", listing(vec![2], vec![])),
        ],
        |b| b,
    );

    let summary = crawler.run().await.unwrap();

    assert_eq!(
        *harness.fetched.lock().unwrap(),
        vec![
            "https://example.test/page1",
            "https://example.test/page2",
            "https://example.test/old",
        ]
    );
    assert_eq!(*harness.collected.lock().unwrap(), vec![2]);
    assert_eq!(summary.items_scraped, 1);
}

#[tokio::test]
async fn redirect_to_the_same_resource_is_still_parsed() {
    let (crawler, harness) = build_crawler(
        vec![
            ("https://example.test/page1", listing(vec![], vec!["/docs/"])),
            ("https://example.test/docs/", Page::Redirect("https://example.test/docs")),
            ("https://example.test/docs", listing(vec![7], vec![])),
        ],
        |b| b,
    );

    crawler.run().await.unwrap();

    assert_eq!(*harness.collected.lock().unwrap(), vec![7]);
}

#[tokio::test]
async fn fetcher_lifecycle_wraps_the_run() {
    let fetcher = MemoryFetcher::new(vec![("https://example.test/page1", listing(vec![1], vec![]))]);
    let opened = fetcher.opened.clone();
    let closed = fetcher.closed.clone();

    let crawler = CrawlerBuilder::new(JsonSpider)
        .seed("https://example.test/page1")
        .with_fetcher(fetcher)
        .add_pipeline(DeduplicationPipeline::new(["id"]))
        .build()
        .unwrap();
    assert!(!opened.load(Ordering::SeqCst));

    let stats = crawler.get_stats();
    crawler.run().await.unwrap();

    assert!(opened.load(Ordering::SeqCst));
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(stats.items_processed(), 1);
}
