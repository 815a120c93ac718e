//! Merge stage: join accumulated search summaries with detail records by
//! listing identity into one normalized output collection.
//!
//! Detail fields win on conflict, except the thumbnail and search page
//! number, which only summaries carry. Summaries keep their relative
//! order; detail records no summary claimed follow in discovery order.
//! An empty identity is never a join key.

use std::collections::{HashMap, HashSet};

use crate::types::{CombinedListing, DetailRecord, ListingId, SearchSummary};

pub fn combine(
    summaries: Vec<SearchSummary>,
    details: Vec<DetailRecord>,
) -> Vec<CombinedListing> {
    // First detail per identity wins; later duplicates are dropped.
    let mut by_id: HashMap<ListingId, DetailRecord> = HashMap::new();
    for detail in &details {
        if !detail.id.is_empty() {
            by_id.entry(detail.id.clone()).or_insert_with(|| detail.clone());
        }
    }

    let mut output = Vec::new();
    let mut emitted: HashSet<ListingId> = HashSet::new();
    let mut consumed: HashSet<ListingId> = HashSet::new();

    for summary in summaries {
        if !summary.id.is_empty() {
            if emitted.contains(&summary.id) {
                continue;
            }
            emitted.insert(summary.id.clone());
        }

        match by_id.remove(&summary.id) {
            Some(detail) => {
                consumed.insert(summary.id.clone());
                output.push(overlay(summary, detail));
            }
            None => output.push(summary_only(summary)),
        }
    }

    // Details visited without a matching summary stand alone.
    for detail in details {
        if consumed.contains(&detail.id) {
            continue;
        }
        if !detail.id.is_empty() {
            if emitted.contains(&detail.id) {
                continue;
            }
            emitted.insert(detail.id.clone());
        }
        output.push(orphan_detail(detail));
    }

    output
}

/// Summary enriched by its detail record; detail wins on collision, the
/// summary's thumbnail and page number are re-asserted since detail
/// pages carry neither.
fn overlay(summary: SearchSummary, detail: DetailRecord) -> CombinedListing {
    let mut specs = summary.specs;
    specs.extend(detail.specs);

    CombinedListing {
        id: summary.id,
        title: detail.title.unwrap_or(summary.title),
        url: detail.url,
        thumbnail: summary.thumbnail,
        page: Some(summary.page),
        price_text: summary.price_text,
        price: detail.price,
        description: detail.description,
        specs,
        equipment: detail.equipment,
        images: detail.images,
        seller: Some(detail.seller),
        detail_scraped: true,
        scraped_at: detail.scraped_at,
    }
}

fn summary_only(summary: SearchSummary) -> CombinedListing {
    CombinedListing {
        id: summary.id,
        title: summary.title,
        url: summary.url,
        thumbnail: summary.thumbnail,
        page: Some(summary.page),
        price_text: summary.price_text,
        price: Default::default(),
        description: None,
        specs: summary.specs,
        equipment: Vec::new(),
        images: Vec::new(),
        seller: None,
        detail_scraped: false,
        scraped_at: summary.scraped_at,
    }
}

fn orphan_detail(detail: DetailRecord) -> CombinedListing {
    CombinedListing {
        id: detail.id,
        title: detail.title.unwrap_or_default(),
        url: detail.url,
        thumbnail: None,
        page: None,
        price_text: None,
        price: detail.price,
        description: detail.description,
        specs: detail.specs,
        equipment: detail.equipment,
        images: detail.images,
        seller: Some(detail.seller),
        detail_scraped: true,
        scraped_at: detail.scraped_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PriceInfo, SellerInfo, SpecField};
    use chrono::Utc;

    fn summary(id: &str, title: &str, page: u32) -> SearchSummary {
        SearchSummary {
            id: ListingId(id.to_string()),
            title: title.to_string(),
            url: format!("https://www.avto.net/Ads/details.asp?id={id}"),
            price_text: Some("10.000 €".to_string()),
            thumbnail: Some(format!("https://images.avto.net/big/{id}.jpg")),
            specs: [(SpecField::Year, "2018".to_string())].into(),
            page,
            scraped_at: Utc::now(),
        }
    }

    fn detail(id: &str, title: &str) -> DetailRecord {
        DetailRecord {
            id: ListingId(id.to_string()),
            url: format!("https://www.avto.net/Ads/details.asp?id={id}"),
            title: Some(title.to_string()),
            price: PriceInfo {
                current: Some("9.500 €".to_string()),
                original: Some("10.000 €".to_string()),
            },
            description: Some("opis".to_string()),
            specs: [
                (SpecField::Year, "2019".to_string()),
                (SpecField::FuelType, "diesel".to_string()),
            ]
            .into(),
            equipment: vec!["ABS".to_string()],
            images: vec![format!("https://images.avto.net/big/{id}_1.jpg")],
            seller: SellerInfo::default(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn matching_pair_is_overlaid() {
        let combined = combine(
            vec![summary("42", "VW Golf", 3)],
            vec![detail("42", "VW Golf 1.5 TSI")],
        );
        assert_eq!(combined.len(), 1);
        let record = &combined[0];
        assert!(record.detail_scraped);
        assert_eq!(record.title, "VW Golf 1.5 TSI");
        // Detail wins on colliding spec keys.
        assert_eq!(record.specs.get(&SpecField::Year).unwrap(), "2019");
        assert_eq!(record.specs.get(&SpecField::FuelType).unwrap(), "diesel");
        // Thumbnail and page number come from the summary.
        assert_eq!(
            record.thumbnail.as_deref(),
            Some("https://images.avto.net/big/42.jpg")
        );
        assert_eq!(record.page, Some(3));
        assert_eq!(record.price.current.as_deref(), Some("9.500 €"));
    }

    #[test]
    fn unmatched_summary_is_flagged_not_scraped() {
        let combined = combine(vec![summary("43", "Audi A3", 1)], Vec::new());
        assert_eq!(combined.len(), 1);
        assert!(!combined[0].detail_scraped);
        assert_eq!(combined[0].title, "Audi A3");
    }

    #[test]
    fn orphan_detail_is_appended() {
        let combined = combine(
            vec![summary("42", "VW Golf", 1)],
            vec![detail("42", "VW Golf"), detail("44", "BMW 320d")],
        );
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].id.0, "42");
        assert_eq!(combined[1].id.0, "44");
        assert!(combined[1].detail_scraped);
        assert_eq!(combined[1].page, None);
    }

    #[test]
    fn empty_identities_never_match_each_other() {
        let mut anonymous_summary = summary("", "neznan", 1);
        anonymous_summary.id = ListingId::empty();
        let mut anonymous_detail = detail("", "neznan");
        anonymous_detail.id = ListingId::empty();

        let combined = combine(vec![anonymous_summary], vec![anonymous_detail]);
        // Both survive as separate records.
        assert_eq!(combined.len(), 2);
        assert!(!combined[0].detail_scraped);
        assert!(combined[1].detail_scraped);
    }

    #[test]
    fn output_is_deduplicated_by_identity() {
        let combined = combine(
            vec![summary("42", "VW Golf", 1), summary("42", "VW Golf", 2)],
            vec![detail("42", "VW Golf"), detail("42", "VW Golf later")],
        );
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].title, "VW Golf");
    }

    #[test]
    fn summary_order_precedes_orphans() {
        let combined = combine(
            vec![summary("1", "a", 1), summary("2", "b", 1)],
            vec![detail("9", "orphan"), detail("2", "b detail")],
        );
        let ids: Vec<&str> = combined.iter().map(|c| c.id.0.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "9"]);
    }
}
