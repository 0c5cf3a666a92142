use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Configuration for the search-result collector (web scraping)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub site: SiteConfig,
    pub scraping: ScrapingConfig,
    pub selectors: SelectorConfig,
}

/// Basic site information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Tag written into the `source` column of every row
    pub name: String,
    pub base_url: String,
    pub user_agent: Option<String>,
}

/// How pages are turned into HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Headless Chrome, executes the page's JavaScript
    Chrome,
    /// Plain HTTP GET, no JavaScript
    Http,
}

/// Scraping behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub query: String,
    pub max_pages: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub scroll_count: usize,
    pub scroll_pause_ms: u64,
    pub timeout_seconds: u64,
    pub renderer: RendererKind,
}

/// CSS selector cascades, tried in order for each field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub card_selectors: Vec<String>,
    pub name_selectors: Vec<String>,
    pub price_selectors: Vec<String>,
    pub rating_selectors: Vec<String>,
    pub reviews_selectors: Vec<String>,
    /// UI labels that leak into name text and must be removed
    pub name_noise: Vec<String>,
}

impl CollectorConfig {
    /// Search URL for one result page
    pub fn search_url(&self, query: &str, page: u32) -> String {
        let encoded = query
            .split_whitespace()
            .map(|word| form_urlencoded::byte_serialize(word.as_bytes()).collect::<String>())
            .collect::<Vec<_>>()
            .join("+");
        format!(
            "{}/search?q={}&page={}",
            self.site.base_url.trim_end_matches('/'),
            encoded,
            page
        )
    }

    /// Delay bounds in milliseconds, ordered low to high
    pub fn delay_bounds_ms(&self) -> (u64, u64) {
        let ScrapingConfig {
            min_delay_ms,
            max_delay_ms,
            ..
        } = self.scraping;
        (min_delay_ms.min(max_delay_ms), min_delay_ms.max(max_delay_ms))
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Flipkart".to_string(),
            base_url: "https://www.flipkart.com".to_string(),
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            query: "laptop".to_string(),
            max_pages: 10,
            min_delay_ms: 1500,
            max_delay_ms: 3500,
            scroll_count: 5,
            scroll_pause_ms: 2000,
            timeout_seconds: 30,
            renderer: RendererKind::Chrome,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        fn owned(selectors: &[&str]) -> Vec<String> {
            selectors.iter().map(|s| s.to_string()).collect()
        }

        Self {
            card_selectors: owned(&["div[data-id]"]),
            name_selectors: owned(&["div._4rR01T", "a.s1Q9rs", "a"]),
            price_selectors: owned(&["div._30jeq3", "div.Nx9bqj", "div._1vC4OE", "div._25b18c"]),
            rating_selectors: owned(&["div._3LWZlK", "div.XQDdHH"]),
            reviews_selectors: owned(&["span._2_R_DZ", "span.Wphh3N"]),
            name_noise: owned(&["Add to Compare", "Bestseller"]),
        }
    }
}
