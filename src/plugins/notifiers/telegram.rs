use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::core::report::Report;
use crate::models::{ChangeRecord, ChangeType};
use crate::plugins::traits::{NotificationResult, NotifierPlugin};
use crate::utils::error::{AppError, Result};

/// Telegram rejects longer message texts.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const HEADER: &str = "⚠️ Price changes detected:";
const FOOTER_RESERVE: usize = 32;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
struct TelegramResponse {
    #[serde(default)]
    ok: bool,
    description: Option<String>,
    error_code: Option<u16>,
    parameters: Option<ResponseParameters>,
    result: Option<SentMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub text: String,
    pub records_included: usize,
}

pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    fn get_emoji(&self, change_type: ChangeType) -> &str {
        match change_type {
            ChangeType::Decreased => "📉",
            ChangeType::Increased => "📈",
            ChangeType::Unchanged => "💱",
        }
    }

    fn format_record(&self, record: &ChangeRecord) -> String {
        format!(
            "\n{} <b>{}</b>\n   {:.2} → {:.2} ({:+.1} %)",
            self.get_emoji(record.change_type()),
            escape_html(&record.name),
            record.previous_price,
            record.current_price,
            record.delta_percent
        )
    }

    /// Renders the report as HTML, grouped under one heading per source.
    ///
    /// Records that would push the text past [`MAX_MESSAGE_CHARS`] are
    /// replaced by a count, so a run still produces a single message.
    pub fn create_message(&self, report: &Report) -> RenderedMessage {
        let mut text = String::from(HEADER);
        let mut length = text.chars().count();
        let mut records_included = 0;

        'sources: for (source, records) in report.by_source() {
            let heading = format!("\n\n🏷 <b>{}</b>", escape_html(source));
            let mut heading_written = false;

            for record in records {
                let mut block = if heading_written {
                    String::new()
                } else {
                    heading.clone()
                };
                block.push_str(&self.format_record(record));

                let block_length = block.chars().count();
                if length + block_length + FOOTER_RESERVE > MAX_MESSAGE_CHARS {
                    break 'sources;
                }

                text.push_str(&block);
                length += block_length;
                heading_written = true;
                records_included += 1;
            }
        }

        let omitted = report.len() - records_included;
        if omitted > 0 {
            text.push_str(&format!("\n\n… and {} more", omitted));
        }

        RenderedMessage {
            text,
            records_included,
        }
    }

    fn create_payload(&self, text: &str) -> serde_json::Value {
        json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        })
    }
}

#[async_trait]
impl NotifierPlugin for TelegramNotifier {
    fn name(&self) -> &str {
        "Telegram Notifier"
    }

    fn plugin_type(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, report: &Report) -> Result<NotificationResult> {
        let rendered = self.create_message(report);
        let payload = self.create_payload(&rendered.text);

        // Error URLs would contain the bot token
        let response = self
            .client
            .post(self.endpoint())
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        let status = response.status();
        let body: TelegramResponse = response
            .json()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        if status == StatusCode::TOO_MANY_REQUESTS || body.error_code == Some(429) {
            let retry_after = body
                .parameters
                .and_then(|p| p.retry_after)
                .unwrap_or_default();
            return Err(AppError::RateLimited { retry_after });
        }

        if !status.is_success() || !body.ok {
            return Err(AppError::Notification(format!(
                "Telegram rejected the message ({}): {}",
                status,
                body.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        Ok(NotificationResult {
            message_id: body.result.map(|m| m.message_id.to_string()),
            records_sent: rendered.records_included,
            records_omitted: report.len() - rendered.records_included,
        })
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
