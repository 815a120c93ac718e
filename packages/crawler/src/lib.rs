//! Browser-driven scraper for the avto.net car marketplace.
//!
//! The crate walks paginated search results in a headless browser,
//! extracts listing summaries and full detail records through ordered
//! selector strategies, deduplicates discovered URLs, and merges the
//! two record streams into one exported collection.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetcher;
pub mod frontier;
pub mod labels;
pub mod merge;
pub mod page;
pub mod sink;
pub mod strategies;
pub mod types;

pub use config::{CrawlLimits, SearchFilters};
pub use crawler::Crawler;
pub use fetcher::{ChromeFetcher, FetchError, PageFetcher};
pub use merge::combine;
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
pub use types::{
    CombinedListing, CrawlStats, DetailRecord, ListingId, SearchSummary, SpecField,
};
