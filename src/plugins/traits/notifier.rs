use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::report::Report;
use crate::utils::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub message_id: Option<String>,
    pub records_sent: usize,
    /// Records left out to keep the message within the service's size limit.
    pub records_omitted: usize,
}

/// Delivers a run's report as one message.
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    async fn notify(&self, report: &Report) -> Result<NotificationResult>;
}
