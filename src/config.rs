use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::{env, fs};
use url::Url;
use validator::Validate;

use crate::models::SourceConfig;
use crate::scraper::parse_selector;

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";
pub const LEGACY_SOURCE_NAME: &str = "prices";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub monitor: MonitorConfig,
    pub scraper: ScraperConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: i64,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub threshold_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub page_timeout_secs: u64,
    pub user_agent: Option<String>,
    pub chrome_path: Option<String>,
    pub headless: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env::vars().collect())
    }

    /// Builds the configuration from the given variables instead of the
    /// process environment.
    ///
    /// Layers, lowest priority first: built-in defaults, `config/default`,
    /// `config/<RUN_MODE>`, `config/local`, `PRICEWATCH_*` variables, then the
    /// bare `BOT_TOKEN`, `CHAT_ID`, `THRESHOLD` and `DATA_DIR` variables.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let run_mode = var(&vars, "RUN_MODE").unwrap_or_else(|| "development".into());

        let s = Config::builder()
            .set_default("telegram.api_base", DEFAULT_TELEGRAM_API)?
            .set_default("monitor.threshold_percent", 1.0)?
            .set_default("scraper.page_timeout_secs", 60)?
            .set_default("scraper.headless", true)?
            .set_default("storage.data_dir", ".")?
            .set_default("logging.level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("PRICEWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .set_override_option("telegram.bot_token", var(&vars, "BOT_TOKEN"))?
            .set_override_option("telegram.chat_id", var(&vars, "CHAT_ID"))?
            .set_override_option("monitor.threshold_percent", var(&vars, "THRESHOLD"))?
            .set_override_option("storage.data_dir", var(&vars, "DATA_DIR"))?
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if let Some(json) = var(&vars, "SOURCES") {
            config.sources = parse_sources(&json, "SOURCES")?;
        } else if let Some(path) = var(&vars, "SOURCES_FILE") {
            let content = fs::read_to_string(&path).map_err(|e| {
                ConfigError::Message(format!("Cannot read SOURCES_FILE '{}': {}", path, e))
            })?;
            config.sources = parse_sources(&content, &path)?;
        }

        if config.sources.is_empty() {
            if let Some(source) = legacy_source(&vars) {
                config.sources.push(source);
            }
        }

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = var(&vars, "CHROME_PATH");
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "Telegram bot token is required (BOT_TOKEN)".into(),
            ));
        }

        if self.telegram.chat_id == 0 {
            return Err(ConfigError::Message(
                "Telegram chat id is required (CHAT_ID)".into(),
            ));
        }

        if Url::parse(&self.telegram.api_base).is_err() {
            return Err(ConfigError::Message("Invalid Telegram API base URL".into()));
        }

        if !is_valid_threshold(self.monitor.threshold_percent) {
            return Err(ConfigError::Message(
                "Threshold must be a non-negative number".into(),
            ));
        }

        if self.scraper.page_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Scraper page_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.sources.is_empty() {
            return Err(ConfigError::Message(
                "No sources configured \
                 (set SOURCES, SOURCES_FILE or URL/SELECTOR_NAME/SELECTOR_PRICE)"
                    .into(),
            ));
        }

        let mut keys = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Message("Source name must not be blank".into()));
            }

            source.validate().map_err(|e| {
                ConfigError::Message(format!("Invalid source '{}': {}", source.name, e))
            })?;

            for selector in [&source.selector_name, &source.selector_price] {
                if parse_selector(selector).is_err() {
                    return Err(ConfigError::Message(format!(
                        "Invalid source '{}': unparsable CSS selector '{}'",
                        source.name, selector
                    )));
                }
            }

            if let Some(threshold) = source.threshold_percent {
                if !is_valid_threshold(threshold) {
                    return Err(ConfigError::Message(format!(
                        "Invalid source '{}': threshold must be a non-negative number",
                        source.name
                    )));
                }
            }

            if !keys.insert(source.storage_key()) {
                return Err(ConfigError::Message(format!(
                    "Duplicate source storage key '{}'",
                    source.storage_key()
                )));
            }
        }

        Ok(())
    }

    pub fn threshold_for(&self, source: &SourceConfig) -> f64 {
        source.effective_threshold(self.monitor.threshold_percent)
    }
}

fn var(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_valid_threshold(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn parse_sources(json: &str, origin: &str) -> Result<Vec<SourceConfig>, ConfigError> {
    serde_json::from_str(json)
        .map_err(|e| ConfigError::Message(format!("Invalid source list in {}: {}", origin, e)))
}

// Single-source setup from URL / SELECTOR_NAME / SELECTOR_PRICE
fn legacy_source(vars: &HashMap<String, String>) -> Option<SourceConfig> {
    let url = var(vars, "URL");
    let selector_name = var(vars, "SELECTOR_NAME");
    let selector_price = var(vars, "SELECTOR_PRICE");

    if url.is_none() && selector_name.is_none() && selector_price.is_none() {
        return None;
    }

    Some(SourceConfig {
        name: var(vars, "SOURCE_NAME").unwrap_or_else(|| LEGACY_SOURCE_NAME.to_string()),
        url: url.unwrap_or_default(),
        selector_name: selector_name.unwrap_or_default(),
        selector_price: selector_price.unwrap_or_default(),
        threshold_percent: None,
    })
}
