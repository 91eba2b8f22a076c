use serde::{Deserialize, Serialize};
use validator::Validate;

/// One monitored page.
///
/// `name` doubles as the display label in notifications and, once
/// sanitized by [`SourceConfig::storage_key`], as the snapshot file name.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SourceConfig {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,

    #[validate(url(message = "url must be an absolute URL"))]
    pub url: String,

    #[validate(length(min = 1, message = "selector_name must not be empty"))]
    pub selector_name: String,

    #[validate(length(min = 1, message = "selector_price must not be empty"))]
    pub selector_price: String,

    /// Overrides `monitor.threshold_percent` for this source only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_percent: Option<f64>,
}

impl SourceConfig {
    pub fn storage_key(&self) -> String {
        sanitize_key(&self.name)
    }

    pub fn effective_threshold(&self, default_percent: f64) -> f64 {
        self.threshold_percent.unwrap_or(default_percent)
    }
}

/// Turns a source name into a file-name-safe key.
pub fn sanitize_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_whitespace()
                || c.is_control()
                || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            {
                '_'
            } else {
                c
            }
        })
        .collect()
}
