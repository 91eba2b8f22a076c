// Integration tests for Price Sentinel
// These tests drive whole runs through the public API with a fake renderer

pub mod telegram_tests;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
pub use tempfile::TempDir;

use price_sentinel::config::{
    AppConfig, DEFAULT_TELEGRAM_API, LoggingConfig, MonitorConfig, ScraperConfig, StorageConfig,
    TelegramConfig,
};
use price_sentinel::core::report::Report;
use price_sentinel::core::snapshot::SnapshotStore;
use price_sentinel::models::SourceConfig;
use price_sentinel::plugins::{NotificationResult, NotifierPlugin};
use price_sentinel::scraper::{CaptureRequest, PageRenderer, RawCapture, extract_texts};
use price_sentinel::{AppError, Result};

/// Serves canned HTML per URL and extracts texts the same way the Chrome
/// renderer does. Unknown URLs fail like an unreachable page.
#[derive(Default)]
pub struct FakeRenderer {
    pages: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn serve(&self, url: &str, html: String) {
        self.pages.lock().unwrap().insert(url.to_string(), html);
    }

    pub fn take_down(&self, url: &str) {
        self.pages.lock().unwrap().remove(url);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn capture(&self, request: &CaptureRequest) -> Result<RawCapture> {
        self.requests.lock().unwrap().push(request.url.clone());

        let html = self
            .pages
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .ok_or_else(|| AppError::Scraping(format!("Navigation to {} failed", request.url)))?;

        Ok(RawCapture {
            names: extract_texts(&html, &request.selector_name)?,
            prices: extract_texts(&html, &request.selector_price)?,
            partial: false,
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub reports: Mutex<Vec<Report>>,
}

impl RecordingNotifier {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    async fn notify(&self, report: &Report) -> Result<NotificationResult> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(NotificationResult {
            message_id: None,
            records_sent: report.len(),
            records_omitted: 0,
        })
    }
}

/// Catalog page with `.item .name` and `.item .price` elements.
pub fn catalog_page(items: &[(&str, &str)]) -> String {
    let rows: String = items
        .iter()
        .map(|(name, price)| {
            format!(
                "<li class=\"item\">\
                 <span class=\"name\">{}</span><span class=\"price\">{}</span>\
                 </li>",
                name, price
            )
        })
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", rows)
}

pub fn test_source(name: &str) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        url: source_url(name),
        selector_name: ".item .name".to_string(),
        selector_price: ".item .price".to_string(),
        threshold_percent: None,
    }
}

pub fn source_url(name: &str) -> String {
    format!("https://{}.shop.test/catalog", name.to_lowercase().replace(' ', "-"))
}

/// Test configuration for integration tests
pub fn get_test_config(sources: Vec<SourceConfig>, data_dir: &TempDir) -> AppConfig {
    AppConfig {
        telegram: TelegramConfig {
            bot_token: "123456:integration-token".to_string(),
            chat_id: -100200300,
            api_base: DEFAULT_TELEGRAM_API.to_string(),
        },
        monitor: MonitorConfig {
            threshold_percent: 5.0,
        },
        scraper: ScraperConfig {
            page_timeout_secs: 10,
            user_agent: None,
            chrome_path: None,
            headless: true,
        },
        storage: StorageConfig {
            data_dir: data_dir.path().to_string_lossy().to_string(),
        },
        logging: LoggingConfig::default(),
        sources,
    }
}

pub fn create_store(config: &AppConfig) -> SnapshotStore {
    SnapshotStore::from_config(&config.storage)
}

pub fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
