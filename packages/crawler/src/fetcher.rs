//! Browser collaborator boundary.
//!
//! The crawl core never navigates; it asks a [`PageFetcher`] for a
//! rendered page and hands back URLs to visit next. [`ChromeFetcher`] is
//! the production implementation on headless Chrome. Network-level
//! retries live here, not in the orchestrator: a page that fails past the
//! retry budget surfaces as one error.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::CrawlLimits;
use crate::page::RenderedPage;

const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Selector that must appear before a page counts as rendered.
const WAIT_SELECTOR: &str = "body";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("browser session failed: {0}")]
    Browser(String),
    #[error("expected content never appeared on {url}")]
    Timeout { url: Url },
}

/// Delivers rendered pages. Mocked in tests; backed by headless Chrome
/// in production.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<RenderedPage, FetchError>;
}

/// Headless-Chrome page fetcher. One shared browser, one short-lived tab
/// per fetch.
pub struct ChromeFetcher {
    browser: Browser,
    timeout: Duration,
    retry_count: u32,
}

impl ChromeFetcher {
    pub fn launch(limits: &CrawlLimits) -> anyhow::Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("failed to build browser launch options")?;
        let browser = Browser::new(options).context("failed to launch headless Chrome")?;
        Ok(Self {
            browser,
            timeout: limits.request_timeout,
            retry_count: limits.retry_count,
        })
    }

    fn fetch_blocking(
        browser: &Browser,
        url: &Url,
        timeout: Duration,
    ) -> Result<RenderedPage, FetchError> {
        let tab = browser.new_tab().map_err(browser_error)?;
        let result = (|| {
            tab.navigate_to(url.as_str()).map_err(browser_error)?;
            tab.wait_until_navigated().map_err(browser_error)?;
            tab.wait_for_element_with_custom_timeout(WAIT_SELECTOR, timeout)
                .map_err(|_| FetchError::Timeout { url: url.clone() })?;
            let html = tab.get_content().map_err(browser_error)?;
            let final_url = Url::parse(&tab.get_url()).unwrap_or_else(|_| url.clone());
            Ok(RenderedPage {
                url: final_url,
                html,
            })
        })();
        let _ = tab.close(true);
        result
    }
}

fn browser_error(err: anyhow::Error) -> FetchError {
    FetchError::Browser(err.to_string())
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &Url) -> Result<RenderedPage, FetchError> {
        let mut last_error = FetchError::Browser("no fetch attempted".to_string());
        for attempt in 0..=self.retry_count {
            if attempt > 0 {
                debug!(url = %url, attempt, "retrying fetch");
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let browser = self.browser.clone();
            let target = url.clone();
            let timeout = self.timeout;
            let outcome = tokio::task::spawn_blocking(move || {
                Self::fetch_blocking(&browser, &target, timeout)
            })
            .await;

            match outcome {
                Ok(Ok(page)) => return Ok(page),
                Ok(Err(err)) => {
                    warn!(url = %url, attempt, error = %err, "fetch attempt failed");
                    last_error = err;
                }
                Err(join_err) => {
                    warn!(url = %url, attempt, error = %join_err, "fetch task panicked");
                    last_error = FetchError::Browser(join_err.to_string());
                }
            }
        }
        Err(last_error)
    }
}
