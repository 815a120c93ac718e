use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Stable identifier of a listing, parsed from the `id` query parameter
/// of a detail-page URL. Empty when the parameter is absent; an empty
/// identity is never a valid join key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl ListingId {
    /// Parse the listing identity from a detail URL. The parameter key is
    /// matched case-insensitively and may appear at any position.
    pub fn from_url(url: &Url) -> Self {
        let id = url
            .query_pairs()
            .find(|(key, _)| key.eq_ignore_ascii_case("id"))
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_default();
        Self(id)
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical names for the technical spec fields scraped from the site's
/// Slovenian-labeled tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SpecField {
    Make,
    Model,
    Year,
    Mileage,
    FuelType,
    Transmission,
    Engine,
    BodyType,
    Doors,
    Color,
    Vin,
    EmissionClass,
}

/// One row of a paginated search-results page. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    pub id: ListingId,
    pub title: String,
    pub url: String,
    pub price_text: Option<String>,
    pub thumbnail: Option<String>,
    pub specs: BTreeMap<SpecField, String>,
    /// Search page number the row was found on.
    pub page: u32,
    pub scraped_at: DateTime<Utc>,
}

/// Current and original asking price as shown on a detail page. When two
/// distinct price texts appear, the first occurrence is the regular
/// (original) price and the second the financed (current) one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub current: Option<String>,
    pub original: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerType {
    Dealer,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerInfo {
    pub name: Option<String>,
    pub seller_type: SellerType,
    pub location: Option<String>,
    pub phone: Option<String>,
}

impl Default for SellerInfo {
    fn default() -> Self {
        Self {
            name: None,
            seller_type: SellerType::Private,
            location: None,
            phone: None,
        }
    }
}

/// Full listing data scraped from one detail-page visit. Best-effort:
/// any field the page did not yield stays `None`/empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRecord {
    pub id: ListingId,
    pub url: String,
    pub title: Option<String>,
    pub price: PriceInfo,
    pub description: Option<String>,
    pub specs: BTreeMap<SpecField, String>,
    pub equipment: Vec<String>,
    pub images: Vec<String>,
    pub seller: SellerInfo,
    pub scraped_at: DateTime<Utc>,
}

/// Final exported entity: a search summary enriched with its matching
/// detail record (detail fields win on conflict), a summary alone when
/// the detail visit never succeeded, or an orphan detail record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedListing {
    pub id: ListingId,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub page: Option<u32>,
    pub price_text: Option<String>,
    pub price: PriceInfo,
    pub description: Option<String>,
    pub specs: BTreeMap<SpecField, String>,
    pub equipment: Vec<String>,
    pub images: Vec<String>,
    pub seller: Option<SellerInfo>,
    /// False when no detail page was scraped for this listing.
    pub detail_scraped: bool,
    pub scraped_at: DateTime<Utc>,
}

/// End-of-run counters, the only externally observable artifact of a
/// crawl beyond the records themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_processed: usize,
    pub listings_found: usize,
    pub unique_urls: usize,
    pub enqueued: usize,
    pub details_scraped: usize,
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_id_from_query_parameter() {
        let url = Url::parse("https://www.avto.net/Ads/details.asp?id=12345").unwrap();
        assert_eq!(ListingId::from_url(&url).0, "12345");
    }

    #[test]
    fn listing_id_key_position_and_casing() {
        let url =
            Url::parse("https://www.avto.net/Ads/details.asp?view=1&ID=12345&src=s").unwrap();
        assert_eq!(ListingId::from_url(&url).0, "12345");
    }

    #[test]
    fn listing_id_missing_parameter_is_empty() {
        let url = Url::parse("https://www.avto.net/Ads/details.asp?view=1").unwrap();
        let id = ListingId::from_url(&url);
        assert!(id.is_empty());
        assert_eq!(id, ListingId::empty());
    }
}
