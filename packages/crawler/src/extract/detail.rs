//! Detail-page extraction.

use std::collections::BTreeMap;

use chrono::Utc;
use scraper::{ElementRef, Selector};

use super::{is_price_text, table_specs};
use crate::page::{element_text, first_text_in, PageDom};
use crate::strategies::{resolve_field, Strategy};
use crate::types::{DetailRecord, ListingId, PriceInfo, SellerInfo, SellerType, SpecField};

const TITLE: &[Strategy] = &[Strategy::CssText("h1")];

/// Preceding-sibling text shorter than this is assumed to be a stray
/// heading rather than the free-text description.
const DESCRIPTION_MIN_LEN: usize = 20;

/// Section header preceding the spec table on every layout variant;
/// never the description.
const BASIC_INFO_HEADER: &str = "Osnovni podatki";

/// Extract one full listing record from a rendered detail page.
/// Best-effort and infallible: each field falls back to `None`/empty
/// independently of the others.
pub fn extract_detail_record(page: &PageDom) -> DetailRecord {
    let url = page.url().clone();
    DetailRecord {
        id: ListingId::from_url(&url),
        url: url.to_string(),
        title: resolve_field(page, TITLE),
        price: extract_price(page),
        description: extract_description(page),
        specs: extract_specs(page),
        equipment: extract_equipment(page),
        images: extract_images(page),
        seller: extract_seller(page),
        scraped_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Price
// ---------------------------------------------------------------------------

/// Three-tier fallback: the CENA structural marker, then price-styled
/// spans inside content cards, then any bold span carrying a currency
/// symbol. When two distinct texts appear the first is the regular
/// (original) price and the second the financed (current) one.
fn extract_price(page: &PageDom) -> PriceInfo {
    if let Some(container) = page.marker_sibling("CENA") {
        let texts = price_texts_in(&container);
        if !texts.is_empty() {
            return assign_prices(texts);
        }
    }

    let mut texts: Vec<String> = Vec::new();
    for span in page.select_all(r#"div.card span[class*="Cena"], div.card-body span[class*="Cena"]"#)
    {
        let text = element_text(&span);
        if is_price_text(&text) && !texts.contains(&text) {
            texts.push(text);
        }
    }
    if !texts.is_empty() {
        return assign_prices(texts);
    }

    for bold in page.select_all("span.fw-bold, b, strong") {
        let text = element_text(&bold);
        if is_price_text(&text) {
            return PriceInfo {
                current: Some(text),
                original: None,
            };
        }
    }

    PriceInfo::default()
}

/// Distinct price texts among the leaf spans of a container, in document
/// order. A container with no spans at all contributes its own text.
fn price_texts_in(container: &ElementRef<'_>) -> Vec<String> {
    let span_selector = match Selector::parse("span") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut texts: Vec<String> = Vec::new();
    let mut push = |text: String| {
        if is_price_text(&text) && !texts.contains(&text) {
            texts.push(text);
        }
    };

    let spans: Vec<_> = container.select(&span_selector).collect();
    if spans.is_empty() {
        push(element_text(container));
    } else {
        for span in spans {
            // Leaf spans only; wrappers would repeat their children's text.
            if span.select(&span_selector).next().is_none() {
                push(element_text(&span));
            }
        }
    }
    texts
}

fn assign_prices(texts: Vec<String>) -> PriceInfo {
    let mut texts = texts.into_iter();
    let first = texts.next();
    let second = texts.next();
    match second {
        Some(current) => PriceInfo {
            current: Some(current),
            original: first,
        },
        None => PriceInfo {
            current: first,
            original: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Description and specs
// ---------------------------------------------------------------------------

fn extract_description(page: &PageDom) -> Option<String> {
    // Designated notes container, when the variant has one.
    let notes: Vec<String> = page
        .select_all("ul.OglasDataOpombe li, div.OglasOpombe li")
        .iter()
        .map(element_text)
        .filter(|line| !line.is_empty())
        .collect();
    if !notes.is_empty() {
        return Some(notes.join("\n"));
    }

    // Otherwise the description is the nearest substantial element
    // preceding the spec table.
    let table = first_spec_table(page)?;
    for node in table.prev_siblings() {
        if let Some(el) = ElementRef::wrap(node) {
            let text = element_text(&el);
            if text.chars().count() >= DESCRIPTION_MIN_LEN
                && !text.eq_ignore_ascii_case(BASIC_INFO_HEADER)
            {
                return Some(text);
            }
        }
    }
    None
}

fn extract_specs(page: &PageDom) -> BTreeMap<SpecField, String> {
    first_spec_table(page)
        .map(|table| table_specs(&table))
        .unwrap_or_default()
}

/// The PODATKI structural marker anchors the spec table; when the marker
/// is gone, fall back to the first table that yields any recognized
/// label/value row.
fn first_spec_table<'a>(page: &'a PageDom) -> Option<ElementRef<'a>> {
    if let Some(el) = page.marker_sibling("PODATKI") {
        if el.value().name() == "table" {
            return Some(el);
        }
        if let Ok(selector) = Selector::parse("table") {
            if let Some(table) = el.select(&selector).next() {
                return Some(table);
            }
        }
    }
    page.select_all("table")
        .into_iter()
        .find(|table| !table_specs(table).is_empty())
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

/// Equipment lives in the table whose header cell names it. Cells are
/// flattened into individual lines; lines under 3 characters or ending
/// in a colon are markup noise, and repeats are dropped. Only the header
/// text itself is excluded, so items like "Zimska oprema" survive.
fn extract_equipment(page: &PageDom) -> Vec<String> {
    let cell_selector = match Selector::parse("td") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    for table in page.select_all("table") {
        let header = first_text_in(&table, "th, td").unwrap_or_default();
        if !header.to_lowercase().contains("oprema") {
            continue;
        }

        let mut items: Vec<String> = Vec::new();
        for cell in table.select(&cell_selector) {
            for chunk in cell.text() {
                let line = chunk.split_whitespace().collect::<Vec<_>>().join(" ");
                if line.chars().count() < 3
                    || line.ends_with(':')
                    || line.eq_ignore_ascii_case(&header)
                {
                    continue;
                }
                if !items.contains(&line) {
                    items.push(line);
                }
            }
        }
        return items;
    }
    Vec::new()
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

static PHOTO_PATTERNS: &[&str] = &[
    "div.GO-OglasThumb img",
    "div.OglasFoto img",
    "td.OglasPhoto img",
];

fn extract_images(page: &PageDom) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    let mut push = |url: String| {
        let url = normalize_image_url(&url);
        if !images.contains(&url) {
            images.push(url);
        }
    };

    for css in PHOTO_PATTERNS {
        for img in page.select_all(css) {
            let src = img
                .value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
                .or_else(|| img.value().attr("data-original"));
            if let Some(src) = src {
                match page.resolve_href(src) {
                    Some(absolute) => push(absolute.to_string()),
                    None => {}
                }
            }
        }
    }

    // Zoom links to full-size photos on the same domain.
    for anchor in page.select_all("a[href]") {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !is_image_href(href) {
            continue;
        }
        if let Some(absolute) = page.resolve_href(href) {
            if absolute.host_str() == page.url().host_str() {
                push(absolute.to_string());
            }
        }
    }

    images
}

fn is_image_href(href: &str) -> bool {
    let href = href.to_lowercase();
    href.ends_with(".jpg") || href.ends_with(".jpeg") || href.ends_with(".png")
}

/// Rewrite thumbnail path segments to the full-resolution variant.
/// Idempotent under re-application.
pub fn normalize_image_url(url: &str) -> String {
    url.replace("/thumb/", "/big/").replace("/small/", "/big/")
}

// ---------------------------------------------------------------------------
// Seller
// ---------------------------------------------------------------------------

fn extract_seller(page: &PageDom) -> SellerInfo {
    let phone = page
        .first_attr(r#"a[href^="tel:"]"#, "href")
        .map(|href| href.trim_start_matches("tel:").trim().to_string())
        .filter(|p| !p.is_empty())
        .or_else(|| {
            icon_adjacent_text(page, "i.fa-phone, i.fa-phone-alt, i.bi-telephone")
                .filter(|text| is_phone_like(text))
        });

    let name = page
        .marker_sibling("PRODAJALEC")
        .and_then(|el| first_text_in(&el, "b, a, h5").or_else(|| non_empty(element_text(&el))))
        .or_else(|| {
            let icon = page.select_first("i.fa-user, i.bi-person")?;
            let parent = ElementRef::wrap(icon.parent()?)?;
            first_text_in(&parent, "b, a")
        });

    let location = icon_adjacent_text(
        page,
        "i.fa-map-marker, i.fa-map-marker-alt, i.bi-geo-alt",
    );

    let seller_type = if page
        .select_first("i.fa-building, i.bi-building")
        .is_some()
    {
        SellerType::Dealer
    } else {
        SellerType::Private
    };

    SellerInfo {
        name,
        seller_type,
        location,
        phone,
    }
}

/// Text of the element wrapping an icon; the icon itself renders no text,
/// so the parent's text is the adjacent label.
fn icon_adjacent_text(page: &PageDom, icon_css: &str) -> Option<String> {
    let icon = page.select_first(icon_css)?;
    let parent = ElementRef::wrap(icon.parent()?)?;
    non_empty(element_text(&parent))
}

fn is_phone_like(text: &str) -> bool {
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
    digits >= 6
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || " +-/().".contains(c))
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}
