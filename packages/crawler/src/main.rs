use std::sync::Arc;

use anyhow::{Context, Result};
use avtonet_crawler::{
    combine, ChromeFetcher, Crawler, CrawlLimits, JsonLinesSink, RecordSink, SearchFilters,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,avtonet_crawler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let filters = load_filters()?;
    let limits = CrawlLimits::default();

    info!(start_url = %filters.start_url(), "starting avto.net crawl");

    let fetcher = Arc::new(ChromeFetcher::launch(&limits)?);
    let sink = Arc::new(JsonLinesSink::create("records.jsonl").await?);

    let crawler = Crawler::new(fetcher, Arc::clone(&sink), limits);
    let stats = crawler.run(&filters).await?;

    info!(
        pages = stats.pages_processed,
        listings = stats.listings_found,
        details = stats.details_scraped,
        errors = stats.errors,
        "crawl complete"
    );

    let combined = combine(sink.summaries().await?, sink.details().await?);
    let json = serde_json::to_string_pretty(&combined)?;
    tokio::fs::write("listings.json", json)
        .await
        .context("writing listings.json")?;
    info!(count = combined.len(), "saved merged listings to listings.json");

    Ok(())
}

/// Filters come from a JSON file named by AVTONET_FILTERS, or from the
/// default empty filter set (an unfiltered search) when unset.
fn load_filters() -> Result<SearchFilters> {
    match std::env::var("AVTONET_FILTERS") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading filter file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing filter file {path}"))
        }
        Err(_) => Ok(SearchFilters::default()),
    }
}
