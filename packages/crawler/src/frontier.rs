//! Crawl frontier: URL deduplication and pagination continuation.

use std::collections::HashSet;

use url::Url;

use crate::page::{element_text, first_attr_in, PageDom};

/// Set of normalized URL fingerprints already enqueued during this run.
/// `admit` is the sole mutation path, which guarantees at-most-once
/// enqueue per logical URL for the lifetime of a crawl. The orchestrator
/// shares it across tasks behind a mutex.
#[derive(Debug, Default)]
pub struct Frontier {
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized dedup form of a URL: lowercase with trailing slashes
    /// stripped, so tracking decoration like casing or a trailing slash
    /// never re-admits a listing.
    pub fn fingerprint(url: &str) -> String {
        url.trim().to_lowercase().trim_end_matches('/').to_string()
    }

    /// Admit the URLs not yet seen, recording their fingerprints. Each
    /// fingerprint's first URL is returned exactly once across repeated
    /// calls with overlapping sets.
    pub fn admit(&mut self, urls: &[String]) -> Vec<String> {
        let mut admitted = Vec::new();
        for url in urls {
            if self.seen.insert(Self::fingerprint(url)) {
                admitted.push(url.clone());
            }
        }
        admitted
    }

    /// Number of unique URLs seen so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

/// Locate the next-page link on a search-results page, trying the
/// pagination control, then the localized link text, then legacy arrow
/// markup. `None` means the last page was reached, a normal terminal
/// condition.
pub fn find_next_page(page: &PageDom) -> Option<Url> {
    next_from_pagination(page)
        .or_else(|| next_from_text(page))
        .or_else(|| next_from_legacy(page))
        .and_then(|href| page.resolve_href(&href))
}

fn next_from_pagination(page: &PageDom) -> Option<String> {
    for li in page.select_all("ul.pagination li.page-item") {
        let class = li.value().attr("class").unwrap_or_default();
        if class.contains("disabled") {
            continue;
        }
        let Some(anchor) = li_anchor(&li) else { continue };
        let rel_next = anchor.value().attr("rel") == Some("next");
        let text = element_text(&anchor).to_lowercase();
        if rel_next || text.contains("naprej") || text.contains('»') {
            return anchor.value().attr("href").map(|h| h.to_string());
        }
    }
    None
}

fn li_anchor<'a>(li: &scraper::ElementRef<'a>) -> Option<scraper::ElementRef<'a>> {
    let selector = scraper::Selector::parse("a.page-link, a").ok()?;
    li.select(&selector).next()
}

fn next_from_text(page: &PageDom) -> Option<String> {
    page.select_all("a")
        .into_iter()
        .find(|a| {
            !in_disabled_item(a) && element_text(a).to_lowercase().contains("naprej")
        })
        .and_then(|a| a.value().attr("href").map(|h| h.to_string()))
}

fn next_from_legacy(page: &PageDom) -> Option<String> {
    page.select_all("a")
        .into_iter()
        .find(|a| {
            if in_disabled_item(a) {
                return false;
            }
            let text = element_text(a);
            if text.contains('»') || text.contains('›') {
                return true;
            }
            first_attr_in(a, "img", "src")
                .map(|src| src.to_lowercase().contains("next"))
                .unwrap_or(false)
        })
        .and_then(|a| a.value().attr("href").map(|h| h.to_string()))
}

/// A link inside a disabled pagination item is not a continuation; it is
/// how the site renders the last page.
fn in_disabled_item(a: &scraper::ElementRef<'_>) -> bool {
    a.ancestors().any(|node| {
        scraper::ElementRef::wrap(node)
            .map(|el| {
                el.value().name() == "li"
                    && el.value().attr("class").unwrap_or_default().contains("disabled")
            })
            .unwrap_or(false)
    })
}
