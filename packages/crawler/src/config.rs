//! Configuration consumed by the crawl: user search filters (used only to
//! build the start URL) and run-level limits. Loading these from the
//! environment or a file is the caller's job; the crawler only consumes
//! the structured values.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

const SEARCH_BASE: &str = "https://www.avto.net/Ads/results.asp";

/// User filter set. Every field is optional; unset fields are simply
/// omitted from the start URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
    pub year_min: Option<u32>,
    pub year_max: Option<u32>,
    pub mileage_max: Option<u32>,
    pub fuel: Option<String>,
    pub body_type: Option<String>,
    pub location: Option<String>,
}

impl SearchFilters {
    /// First search-results URL for this filter set.
    pub fn start_url(&self) -> Url {
        let mut url = Url::parse(SEARCH_BASE).expect("search base URL is valid");
        {
            let mut query = url.query_pairs_mut();
            let mut push = |key: &str, value: &Option<String>| {
                if let Some(value) = value {
                    if !value.trim().is_empty() {
                        query.append_pair(key, value.trim());
                    }
                }
            };
            push("znamka", &self.brand);
            push("model", &self.model);
            push("gorivo", &self.fuel);
            push("oblika", &self.body_type);
            push("regija", &self.location);

            let mut push_num = |key: &str, value: Option<u32>| {
                if let Some(value) = value {
                    query.append_pair(key, &value.to_string());
                }
            };
            push_num("cenaMin", self.price_min);
            push_num("cenaMax", self.price_max);
            push_num("letnikMin", self.year_min);
            push_num("letnikMax", self.year_max);
            push_num("kmMax", self.mileage_max);
        }
        url
    }
}

/// Run-level caps and scheduling knobs. Reaching any cap stops the
/// scheduling of new tasks; in-flight ones complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlLimits {
    /// Maximum number of search-results pages to schedule.
    pub max_pages: usize,
    /// Maximum number of detail-page visits to schedule.
    pub max_detail_visits: usize,
    /// Cap on total scheduled tasks of any kind.
    pub max_requests: usize,
    /// Concurrent page-processing tasks. The site rate-limits
    /// aggressively, so this is typically 1.
    pub concurrency: usize,
    /// Bound on waiting for expected page content to appear.
    pub request_timeout: Duration,
    /// Fetch retries inside the browser collaborator.
    pub retry_count: u32,
    /// Randomized delay before each navigation, in milliseconds.
    pub delay_ms: (u64, u64),
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_pages: 10,
            max_detail_visits: 200,
            max_requests: 500,
            concurrency: 1,
            request_timeout: Duration::from_secs(30),
            retry_count: 2,
            delay_ms: (800, 2_500),
        }
    }
}
