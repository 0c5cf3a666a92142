use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use wreq::Client;
use wreq_util::Emulation;

use crate::config::{CollectorConfig, RendererKind};

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Turns a URL into the HTML a user would see
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;
}

/// Build the renderer selected in config
pub fn renderer_from_config(config: &CollectorConfig) -> Result<Box<dyn PageRenderer>> {
    Ok(match config.scraping.renderer {
        RendererKind::Chrome => Box::new(ChromeRenderer::launch(config)?),
        RendererKind::Http => Box::new(HttpRenderer::new(config)?),
    })
}

/// Headless Chrome renderer. The Chrome process lives as long as this value
/// and is killed when it is dropped.
pub struct ChromeRenderer {
    browser: Browser,
    user_agent: Option<String>,
    scroll_count: usize,
    scroll_pause: Duration,
    timeout: Duration,
}

impl ChromeRenderer {
    pub fn launch(config: &CollectorConfig) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(Duration::from_secs(300))
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser,
            user_agent: config.site.user_agent.clone(),
            scroll_count: config.scraping.scroll_count,
            scroll_pause: Duration::from_millis(config.scraping.scroll_pause_ms),
            timeout: Duration::from_secs(config.scraping.timeout_seconds),
        })
    }

    async fn load(&self, tab: &Tab, url: &str) -> Result<String> {
        tab.set_default_timeout(self.timeout);
        if let Some(user_agent) = &self.user_agent {
            tab.set_user_agent(user_agent, None, None)?;
        }

        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;

        // Cards are lazy-loaded while scrolling
        for _ in 0..self.scroll_count {
            tab.evaluate(SCROLL_TO_BOTTOM, false)?;
            sleep(self.scroll_pause).await;
        }

        let html = tab.get_content()?;
        if html.is_empty() {
            return Err(anyhow!("Empty HTML from {}", url));
        }
        Ok(html)
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let tab = self.browser.new_tab().context("Failed to open browser tab")?;
        let result = self.load(&tab, url).await;

        if let Err(e) = tab.close(true) {
            debug!("Failed to close tab for {}: {}", url, e);
        }

        let html = result?;
        info!("Rendered {} characters from {}", html.len(), url);
        Ok(html)
    }
}

/// Plain HTTP renderer with browser emulation, for pages that need no JavaScript
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let client = Client::builder()
            .emulation(Emulation::Firefox136)
            .timeout(Duration::from_secs(config.scraping.timeout_seconds))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Network error: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response text: {}", e))?;

        if html.is_empty() {
            return Err(anyhow!("Empty HTML response"));
        }

        info!("Successfully fetched {} characters from {}", html.len(), url);
        Ok(html)
    }
}
