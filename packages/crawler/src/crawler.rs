//! Crawl orchestration.
//!
//! A task queue over two page kinds: search-results pages (extract
//! summaries, derive detail URLs, find the next page) and detail pages
//! (extract one full record). The frontier set, the pending queue and
//! the run counters are shared mutable state owned here and touched only
//! under their mutexes, so concurrent tasks can never double-admit a
//! URL. Reaching a run cap stops scheduling; in-flight tasks complete.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{CrawlLimits, SearchFilters};
use crate::extract::{extract_detail_record, extract_search_summaries};
use crate::fetcher::PageFetcher;
use crate::frontier::{find_next_page, Frontier};
use crate::page::PageDom;
use crate::sink::RecordSink;
use crate::types::CrawlStats;

/// One unit of crawl work, dispatched by page kind.
#[derive(Debug, Clone)]
enum CrawlTask {
    Search { url: Url, page_num: u32 },
    Detail { url: Url },
}

#[derive(Debug, Default)]
struct Counters {
    pages_processed: usize,
    listings_found: usize,
    details_scraped: usize,
    errors: usize,
    enqueued: usize,
    search_scheduled: usize,
    detail_scheduled: usize,
}

struct Shared {
    frontier: Mutex<Frontier>,
    queue: Mutex<VecDeque<CrawlTask>>,
    counters: Mutex<Counters>,
}

impl Shared {
    fn new() -> Self {
        Self {
            frontier: Mutex::new(Frontier::new()),
            queue: Mutex::new(VecDeque::new()),
            counters: Mutex::new(Counters::default()),
        }
    }

    fn record_error(&self, url: &Url, error: &dyn std::fmt::Display) {
        self.counters.lock().unwrap().errors += 1;
        warn!(url = %url, error = %error, "page failed");
    }
}

pub struct Crawler<F, S> {
    fetcher: Arc<F>,
    sink: Arc<S>,
    limits: CrawlLimits,
}

impl<F, S> Crawler<F, S>
where
    F: PageFetcher + 'static,
    S: RecordSink + 'static,
{
    pub fn new(fetcher: Arc<F>, sink: Arc<S>, limits: CrawlLimits) -> Self {
        Self {
            fetcher,
            sink,
            limits,
        }
    }

    /// Run one crawl from the filter set's start URL until the frontier
    /// is exhausted or a cap is hit, then return the run counters.
    pub async fn run(&self, filters: &SearchFilters) -> Result<CrawlStats> {
        let shared = Arc::new(Shared::new());
        let start = filters.start_url();
        info!(start_url = %start, "starting crawl");

        {
            let mut frontier = shared.frontier.lock().unwrap();
            if !frontier.admit(&[start.to_string()]).is_empty() {
                let mut counters = shared.counters.lock().unwrap();
                counters.enqueued += 1;
                counters.search_scheduled += 1;
                shared.queue.lock().unwrap().push_back(CrawlTask::Search {
                    url: start,
                    page_num: 1,
                });
            }
        }

        let concurrency = self.limits.concurrency.max(1);
        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut scheduled_total = 0usize;

        loop {
            while in_flight.len() < concurrency && scheduled_total < self.limits.max_requests {
                let Some(task) = shared.queue.lock().unwrap().pop_front() else {
                    break;
                };
                scheduled_total += 1;
                in_flight.spawn(process_task(
                    task,
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.sink),
                    Arc::clone(&shared),
                    self.limits.clone(),
                ));
            }

            match in_flight.join_next().await {
                Some(Ok(())) => {}
                Some(Err(join_err)) => {
                    warn!(error = %join_err, "crawl task aborted");
                    shared.counters.lock().unwrap().errors += 1;
                }
                None => {
                    let queue_empty = shared.queue.lock().unwrap().is_empty();
                    if queue_empty || scheduled_total >= self.limits.max_requests {
                        break;
                    }
                }
            }
        }

        let stats = {
            let counters = shared.counters.lock().unwrap();
            let frontier = shared.frontier.lock().unwrap();
            CrawlStats {
                pages_processed: counters.pages_processed,
                listings_found: counters.listings_found,
                unique_urls: frontier.seen_count(),
                enqueued: counters.enqueued,
                details_scraped: counters.details_scraped,
                errors: counters.errors,
            }
        };
        info!(
            pages = stats.pages_processed,
            listings = stats.listings_found,
            unique_urls = stats.unique_urls,
            enqueued = stats.enqueued,
            details = stats.details_scraped,
            errors = stats.errors,
            "crawl finished"
        );
        Ok(stats)
    }
}

async fn process_task<F: PageFetcher, S: RecordSink>(
    task: CrawlTask,
    fetcher: Arc<F>,
    sink: Arc<S>,
    shared: Arc<Shared>,
    limits: CrawlLimits,
) {
    politeness_delay(limits.delay_ms).await;

    match task {
        CrawlTask::Search { url, page_num } => {
            let page = match fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(err) => {
                    shared.record_error(&url, &err);
                    return;
                }
            };

            // The parsed DOM stays inside this scope; extraction is
            // synchronous and read-only.
            let (summaries, next) = {
                let dom = PageDom::parse(&page);
                (
                    extract_search_summaries(&dom, page_num),
                    find_next_page(&dom),
                )
            };
            info!(
                url = %url,
                page = page_num,
                listings = summaries.len(),
                "search page processed"
            );

            for summary in &summaries {
                if let Err(err) = sink.push_summary(summary).await {
                    warn!(url = %summary.url, error = %err, "failed to hand off summary");
                }
            }

            let detail_urls: Vec<String> = summaries.iter().map(|s| s.url.clone()).collect();
            let mut frontier = shared.frontier.lock().unwrap();
            let admitted = frontier.admit(&detail_urls);
            let mut counters = shared.counters.lock().unwrap();
            let mut queue = shared.queue.lock().unwrap();

            counters.listings_found += summaries.len();
            for admitted_url in admitted {
                if counters.detail_scheduled >= limits.max_detail_visits {
                    debug!(url = %admitted_url, "detail cap reached, not scheduling");
                    break;
                }
                if let Ok(detail_url) = Url::parse(&admitted_url) {
                    queue.push_back(CrawlTask::Detail { url: detail_url });
                    counters.detail_scheduled += 1;
                    counters.enqueued += 1;
                }
            }

            if let Some(next_url) = next {
                if counters.search_scheduled < limits.max_pages
                    && !frontier.admit(&[next_url.to_string()]).is_empty()
                {
                    queue.push_back(CrawlTask::Search {
                        url: next_url,
                        page_num: page_num + 1,
                    });
                    counters.search_scheduled += 1;
                    counters.enqueued += 1;
                }
            }
            counters.pages_processed += 1;
        }

        CrawlTask::Detail { url } => {
            let page = match fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(err) => {
                    shared.record_error(&url, &err);
                    return;
                }
            };

            let record = {
                let dom = PageDom::parse(&page);
                extract_detail_record(&dom)
            };
            debug!(url = %url, id = %record.id, "detail page processed");

            if let Err(err) = sink.push_detail(&record).await {
                warn!(url = %url, error = %err, "failed to hand off detail record");
            }

            let mut counters = shared.counters.lock().unwrap();
            counters.details_scraped += 1;
            counters.pages_processed += 1;
        }
    }
}

/// Randomized pause between consecutive navigations; politeness toward a
/// site that rate-limits aggressively.
async fn politeness_delay(bounds: (u64, u64)) {
    let (lo, hi) = bounds;
    if hi == 0 {
        return;
    }
    let ms = rand::thread_rng().gen_range(lo..=hi.max(lo));
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchError;
    use crate::page::RenderedPage;
    use crate::sink::MemorySink;
    use std::collections::HashMap;

    struct MockFetcher {
        pages: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn new(pages: Vec<(&str, String)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(url, html)| (url.to_string(), html))
                    .collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(&self, url: &Url) -> Result<RenderedPage, FetchError> {
            self.fetched.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(html) => Ok(RenderedPage {
                    url: url.clone(),
                    html: html.clone(),
                }),
                None => Err(FetchError::Timeout { url: url.clone() }),
            }
        }
    }

    fn card(id: u32, title: &str) -> String {
        format!(
            r#"<div class="GO-Results-Row">
                 <div class="GO-Results-Naziv"><span>{title}</span></div>
                 <div class="GO-Results-Price-TXT-AkcijaCena">9.990 &euro;</div>
                 <a href="details.asp?id={id}">{title}</a>
               </div>"#
        )
    }

    fn search_page(cards: &[String], next: Option<&str>) -> String {
        let next_link = next
            .map(|href| format!(r#"<a href="{href}">Naprej</a>"#))
            .unwrap_or_default();
        format!("<html><body>{}{next_link}</body></html>", cards.join("\n"))
    }

    fn detail_page(title: &str) -> String {
        format!(
            r#"<html><body><h1>{title}</h1>
               <!-- CENA --><div><span>9.500 &euro;</span></div>
               </body></html>"#
        )
    }

    fn start_url() -> String {
        SearchFilters::default().start_url().to_string()
    }

    fn no_delay_limits() -> CrawlLimits {
        CrawlLimits {
            delay_ms: (0, 0),
            ..Default::default()
        }
    }

    fn two_page_site() -> MockFetcher {
        let page2_url = "https://www.avto.net/Ads/results.asp?stran=2";
        let start = start_url();
        MockFetcher::new(vec![
            (
                start.as_str(),
                search_page(
                    &[card(1, "VW Golf"), card(2, "Audi A3")],
                    Some(page2_url),
                ),
            ),
            (
                page2_url,
                // Listing 1 reappears on page 2; only listing 3 is new.
                search_page(&[card(1, "VW Golf"), card(3, "BMW 320d")], None),
            ),
            (
                "https://www.avto.net/Ads/details.asp?id=1",
                detail_page("VW Golf"),
            ),
            (
                "https://www.avto.net/Ads/details.asp?id=2",
                detail_page("Audi A3"),
            ),
            (
                "https://www.avto.net/Ads/details.asp?id=3",
                detail_page("BMW 320d"),
            ),
        ])
    }

    #[tokio::test]
    async fn crawl_walks_pagination_and_dedupes_details() {
        let fetcher = Arc::new(two_page_site());
        let sink = Arc::new(MemorySink::new());
        let crawler = Crawler::new(Arc::clone(&fetcher), Arc::clone(&sink), no_delay_limits());

        let stats = crawler.run(&SearchFilters::default()).await.unwrap();

        // 2 search pages + 3 unique detail pages; listing 1 on page 2 is
        // not fetched again.
        assert_eq!(stats.pages_processed, 5);
        assert_eq!(stats.listings_found, 4);
        assert_eq!(stats.details_scraped, 3);
        assert_eq!(stats.unique_urls, 5);
        assert_eq!(stats.enqueued, 5);
        assert_eq!(stats.errors, 0);

        assert_eq!(sink.summaries().await.unwrap().len(), 4);
        assert_eq!(sink.details().await.unwrap().len(), 3);

        let fetched = fetcher.fetched.lock().unwrap();
        let detail_fetches = fetched
            .iter()
            .filter(|u| u.contains("details.asp"))
            .count();
        assert_eq!(detail_fetches, 3);
    }

    #[tokio::test]
    async fn caps_stop_scheduling() {
        let fetcher = Arc::new(two_page_site());
        let sink = Arc::new(MemorySink::new());
        let limits = CrawlLimits {
            max_pages: 1,
            max_detail_visits: 1,
            delay_ms: (0, 0),
            ..Default::default()
        };
        let crawler = Crawler::new(fetcher, Arc::clone(&sink), limits);

        let stats = crawler.run(&SearchFilters::default()).await.unwrap();

        // One search page and one detail visit; pagination not followed.
        assert_eq!(stats.pages_processed, 2);
        assert_eq!(stats.details_scraped, 1);
        assert_eq!(sink.summaries().await.unwrap().len(), 2);
        assert_eq!(sink.details().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_page_counts_as_error_and_crawl_continues() {
        let page2_url = "https://www.avto.net/Ads/results.asp?stran=2";
        let start = start_url();
        let fetcher = Arc::new(MockFetcher::new(vec![
            (
                start.as_str(),
                search_page(&[card(1, "VW Golf"), card(2, "Audi A3")], Some(page2_url)),
            ),
            // page 2 and detail 2 are missing: both time out.
            (
                "https://www.avto.net/Ads/details.asp?id=1",
                detail_page("VW Golf"),
            ),
        ]));
        let sink = Arc::new(MemorySink::new());
        let crawler = Crawler::new(fetcher, Arc::clone(&sink), no_delay_limits());

        let stats = crawler.run(&SearchFilters::default()).await.unwrap();

        assert_eq!(stats.errors, 2);
        assert_eq!(stats.details_scraped, 1);
        assert_eq!(sink.details().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_admit_is_exactly_once() {
        let frontier = Arc::new(Mutex::new(Frontier::new()));
        let urls: Vec<String> = (0..50)
            .map(|i| format!("https://www.avto.net/Ads/details.asp?id={}", i % 10))
            .collect();

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let frontier = Arc::clone(&frontier);
            let urls = urls.clone();
            tasks.spawn(async move { frontier.lock().unwrap().admit(&urls).len() });
        }

        let mut admitted_total = 0;
        while let Some(admitted) = tasks.join_next().await {
            admitted_total += admitted.unwrap();
        }
        assert_eq!(admitted_total, 10);
        assert_eq!(frontier.lock().unwrap().seen_count(), 10);
    }
}
