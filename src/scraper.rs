use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::time::{Duration, Instant};

use crate::config::ScraperConfig;
use crate::models::SourceConfig;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub url: String,
    pub selector_name: String,
    pub selector_price: String,
}

impl From<&SourceConfig> for CaptureRequest {
    fn from(source: &SourceConfig) -> Self {
        Self {
            url: source.url.clone(),
            selector_name: source.selector_name.clone(),
            selector_price: source.selector_price.clone(),
        }
    }
}

/// Raw element texts, `names[i]` belonging to `prices[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCapture {
    pub names: Vec<String>,
    pub prices: Vec<String>,
    /// Set when the page did not finish loading within the timeout and the
    /// texts come from whatever had rendered by then.
    pub partial: bool,
}

/// Loads a page and returns the texts of the elements matching both selectors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn capture(&self, request: &CaptureRequest) -> Result<RawCapture>;
}

/// Renders pages in headless Chrome, one browser process per capture.
pub struct ChromeRenderer {
    config: ScraperConfig,
}

impl ChromeRenderer {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn capture(&self, request: &CaptureRequest) -> Result<RawCapture> {
        let config = self.config.clone();
        let request = request.clone();

        // headless_chrome is blocking
        tokio::task::spawn_blocking(move || {
            let session = BrowserSession::acquire(&config)?;
            session.capture(&request)
        })
        .await
        .map_err(|e| AppError::Scraping(format!("Capture task failed: {}", e)))?
    }
}

/// A browser process scoped to a single capture; the process exits when the
/// session is dropped.
pub struct BrowserSession {
    browser: Browser,
    page_timeout: Duration,
    user_agent: Option<String>,
}

impl BrowserSession {
    pub fn acquire(config: &ScraperConfig) -> Result<Self> {
        let launch_options = launch_options(config)?;
        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Scraping(format!("Failed to launch browser: {}", e)))?;

        tracing::debug!("Browser session started");
        Ok(Self {
            browser,
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn capture(&self, request: &CaptureRequest) -> Result<RawCapture> {
        let start_time = Instant::now();

        let tab = self
            .browser
            .new_tab()
            .map_err(|e| AppError::Scraping(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(self.page_timeout);

        if let Some(user_agent) = &self.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| AppError::Scraping(format!("Failed to set user agent: {}", e)))?;
        }

        tab.navigate_to(&request.url).map_err(|e| {
            AppError::Scraping(format!("Navigation to {} failed: {}", request.url, e))
        })?;

        let mut partial = false;
        if let Err(e) = tab.wait_until_navigated() {
            tracing::warn!(
                "Page {} did not finish loading within {:?}, using partial content: {}",
                request.url,
                self.page_timeout,
                e
            );
            partial = true;
        }

        let html = tab
            .get_content()
            .map_err(|e| AppError::Scraping(format!("Failed to get page content: {}", e)))?;

        if let Err(e) = tab.close(true) {
            tracing::debug!("Failed to close tab for {}: {}", request.url, e);
        }

        let names = extract_texts(&html, &request.selector_name)?;
        let prices = extract_texts(&html, &request.selector_price)?;

        tracing::debug!(
            names = names.len(),
            prices = prices.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Captured {}",
            request.url
        );

        Ok(RawCapture {
            names,
            prices,
            partial,
        })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Dropping `Browser` terminates the Chrome process
        tracing::debug!("Browser session closed");
    }
}

fn launch_options(config: &ScraperConfig) -> Result<LaunchOptions<'static>> {
    let mut launch_options = LaunchOptions::default_builder()
        .headless(config.headless)
        .sandbox(false) // Often needed in containerized environments
        .idle_browser_timeout(Duration::from_secs(config.page_timeout_secs + 30))
        .args(vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-extensions"),
        ])
        .build()
        .map_err(|e| AppError::Scraping(format!("Failed to create launch options: {}", e)))?;

    if let Some(chrome_path) = &config.chrome_path {
        launch_options.path = Some(std::path::PathBuf::from(chrome_path));
    }

    Ok(launch_options)
}

/// Text content of every element matching `selector`, in document order.
pub fn extract_texts(html: &str, selector: &str) -> Result<Vec<String>> {
    let css_selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&css_selector)
        .map(|element| element.text().collect::<String>())
        .collect())
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| AppError::InvalidSelector {
        selector: selector.to_string(),
    })
}
