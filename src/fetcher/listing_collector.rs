use anyhow::Result;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::listing_extractor::ListingExtractor;
use super::page_renderer::PageRenderer;
use crate::config::CollectorConfig;
use crate::models::RawListing;

/// Paginated search-result collector.
///
/// Owns its renderer, so a browser-backed renderer is shut down when the
/// collector goes out of scope, whichever way the run ends.
pub struct ListingCollector {
    renderer: Box<dyn PageRenderer>,
    extractor: ListingExtractor,
    config: CollectorConfig,
}

impl ListingCollector {
    pub fn new(renderer: Box<dyn PageRenderer>, config: CollectorConfig) -> Result<Self> {
        let extractor = ListingExtractor::from_config(&config)?;
        Ok(Self {
            renderer,
            extractor,
            config,
        })
    }

    /// Scrape pages `1..=max_pages`. A failing or empty page is logged and
    /// skipped, never fatal.
    pub async fn collect(&self, query: &str, max_pages: u32) -> Vec<RawListing> {
        let mut all_items = Vec::new();

        for page in 1..=max_pages {
            match self.scrape_page(query, page).await {
                Ok(items) if items.is_empty() => {
                    warn!("Page {}: no products matched the configured selectors", page);
                }
                Ok(items) => {
                    info!("Page {}: scraped {} items", page, items.len());
                    all_items.extend(items);
                }
                Err(e) => {
                    error!("Page {} error: {:#}", page, e);
                }
            }

            if page < max_pages {
                sleep(self.next_delay()).await;
            }
        }

        info!("Collected {} listings across {} pages", all_items.len(), max_pages);
        all_items
    }

    async fn scrape_page(&self, query: &str, page: u32) -> Result<Vec<RawListing>> {
        let url = self.config.search_url(query, page);
        info!("Scraping page {}: {}", page, url);

        let html = self.renderer.render(&url).await?;
        Ok(self.extractor.extract_listings(&html, query, page))
    }

    /// Randomized pause between pages
    fn next_delay(&self) -> Duration {
        let (low, high) = self.config.delay_bounds_ms();
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }
}
