//! Record extraction: page DOM in, typed records out.
//!
//! Both entry points are infallible by design. Every sub-extraction is
//! fault-isolated: a missing field falls back to `None`/empty and never
//! aborts the rest of the record.

pub mod detail;
pub mod search;

pub use detail::{extract_detail_record, normalize_image_url};
pub use search::extract_search_summaries;

use std::collections::BTreeMap;

use scraper::{ElementRef, Selector};

use crate::labels;
use crate::page::element_text;
use crate::types::SpecField;

/// Read label/value rows out of a spec table, keeping only labels the
/// dictionary recognizes. The first row claiming a field wins.
pub(crate) fn table_specs(table: &ElementRef<'_>) -> BTreeMap<SpecField, String> {
    let mut specs = BTreeMap::new();
    let row_selector = match Selector::parse("tr") {
        Ok(s) => s,
        Err(_) => return specs,
    };
    let cell_selector = match Selector::parse("th, td") {
        Ok(s) => s,
        Err(_) => return specs,
    };

    for row in table.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| element_text(&cell))
            .collect();
        if cells.len() < 2 || cells[1].is_empty() {
            continue;
        }
        if let Some(field) = labels::canonical_field(&cells[0]) {
            specs.entry(field).or_insert_with(|| cells[1].clone());
        }
    }
    specs
}

/// Price texts carry a currency symbol and at least one digit.
pub(crate) fn is_price_text(text: &str) -> bool {
    text.contains('€') && text.chars().any(|c| c.is_ascii_digit())
}
