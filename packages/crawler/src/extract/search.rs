//! Search-results page extraction.

use chrono::Utc;
use scraper::ElementRef;

use super::table_specs;
use crate::page::{first_attr_in, first_text_in, PageDom};
use crate::types::{ListingId, SearchSummary};

/// Listing-card container patterns, one per known layout era: wide
/// Bootstrap cards, compact Bootstrap cards, legacy result tables.
static CARD_PATTERNS: &[&str] = &[
    "div.GO-Results-Row",
    "div.GO-Results-Top-Row",
    "table.ResultsAd tr.Adrow",
];

static TITLE_PATTERNS: &[&str] = &[
    "div.GO-Results-Naziv span",
    "div.GO-Results-Naziv",
    "span.Adlink",
];

/// Wide and compact price-class variants, then the legacy cell.
static PRICE_PATTERNS: &[&str] = &[
    "div.GO-Results-Price-TXT-AkcijaCena",
    "div.GO-Results-Top-Price-TXT-AkcijaCena",
    "div.GO-Results-Price-TXT-Regular",
    "td.ResultsAdPrice",
];

static PHOTO_PATTERNS: &[&str] = &[
    "div.GO-Results-Photo img",
    "div.GO-Results-Top-Photo img",
    "img.ResultsAdPhoto",
];

/// Enumerate listing cards on a search-results page and produce one
/// summary per card that carries a detail link. Zero cards is a valid
/// result, not an error.
pub fn extract_search_summaries(page: &PageDom, page_num: u32) -> Vec<SearchSummary> {
    let cards = CARD_PATTERNS
        .iter()
        .map(|css| page.select_all(css))
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    cards
        .iter()
        .filter_map(|card| summary_from_card(page, card, page_num))
        .collect()
}

fn summary_from_card(
    page: &PageDom,
    card: &ElementRef<'_>,
    page_num: u32,
) -> Option<SearchSummary> {
    let link = first_attr_in(card, r#"a[href*="details.asp"]"#, "href")
        .or_else(|| first_attr_in(card, r#"a[href*="id="]"#, "href"))?;
    let url = page.resolve_href(&link)?;

    let title = TITLE_PATTERNS
        .iter()
        .find_map(|css| first_text_in(card, css))
        .or_else(|| first_text_in(card, r#"a[href*="details.asp"]"#))
        .unwrap_or_default();

    let price_text = PRICE_PATTERNS
        .iter()
        .find_map(|css| first_text_in(card, css));

    let thumbnail = PHOTO_PATTERNS.iter().find_map(|css| {
        first_attr_in(card, css, "src").or_else(|| first_attr_in(card, css, "data-src"))
    });

    // Partial specs live in an embedded label/value table on every
    // layout variant.
    let mut specs = Default::default();
    for table in tables_in(card) {
        specs = table_specs(&table);
        if !specs.is_empty() {
            break;
        }
    }

    Some(SearchSummary {
        id: ListingId::from_url(&url),
        title,
        url: url.to_string(),
        price_text,
        thumbnail,
        specs,
        page: page_num,
        scraped_at: Utc::now(),
    })
}

fn tables_in<'a>(card: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    match scraper::Selector::parse("table") {
        Ok(selector) => card.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}
