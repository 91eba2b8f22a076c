use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::core::diff::{diff, filter};
use crate::core::parser::parse_capture;
use crate::core::report::Report;
use crate::core::snapshot::SnapshotStore;
use crate::models::{ChangeRecord, SourceConfig, generate_id};
use crate::plugins::traits::{NotificationResult, NotifierPlugin};
use crate::scraper::{CaptureRequest, PageRenderer};
use crate::utils::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source: String,
    pub items_captured: usize,
    /// No snapshot existed before this capture.
    pub first_capture: bool,
    pub snapshot_saved: bool,
    pub changes: Vec<ChangeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub sources_processed: usize,
    pub sources_failed: usize,
    pub changes_detected: usize,
    pub notification: Option<NotificationResult>,
    pub total_time_ms: u64,
}

/// One pass over every configured source, ending in at most one notification.
pub struct Runner<'a> {
    config: &'a AppConfig,
    renderer: &'a dyn PageRenderer,
    store: &'a SnapshotStore,
    notifier: &'a dyn NotifierPlugin,
}

impl<'a> Runner<'a> {
    pub fn new(
        config: &'a AppConfig,
        renderer: &'a dyn PageRenderer,
        store: &'a SnapshotStore,
        notifier: &'a dyn NotifierPlugin,
    ) -> Self {
        Self {
            config,
            renderer,
            store,
            notifier,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let run_id = generate_id();
        let span = tracing::info_span!("run", run_id = %run_id);
        self.run_sources(run_id).instrument(span).await
    }

    async fn run_sources(&self, run_id: String) -> Result<RunSummary> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let mut report = Report::new();
        let mut sources_processed = 0;
        let mut sources_failed = 0;

        tracing::info!("Checking {} sources", self.config.sources.len());

        // One browser process at a time
        for source in &self.config.sources {
            let span = tracing::info_span!("source", name = %source.name);
            match self.process_source(source).instrument(span).await {
                Ok(outcome) => {
                    sources_processed += 1;
                    report.extend_source(outcome.changes);
                }
                Err(e) => {
                    sources_failed += 1;
                    tracing::error!("Skipping source '{}': {}", source.name, e);
                }
            }
        }

        let notification = if report.is_empty() {
            tracing::info!("No price changes reached the threshold");
            None
        } else {
            tracing::info!(
                "Sending {} via {}",
                plural(report.len(), "change"),
                self.notifier.name()
            );
            let result = self.notifier.notify(&report).await.inspect_err(|e| {
                tracing::error!("Notification failed: {}", e);
            })?;
            if result.records_omitted > 0 {
                tracing::warn!(
                    "{} left out of the message due to its size limit",
                    plural(result.records_omitted, "change")
                );
            }
            Some(result)
        };

        let summary = RunSummary {
            run_id,
            started_at,
            sources_processed,
            sources_failed,
            changes_detected: report.len(),
            notification,
            total_time_ms: start_time.elapsed().as_millis() as u64,
        };

        tracing::info!(
            processed = summary.sources_processed,
            failed = summary.sources_failed,
            changes = summary.changes_detected,
            elapsed_ms = summary.total_time_ms,
            "Run finished"
        );

        Ok(summary)
    }

    /// Captures one source, diffs it against its snapshot and stores the new
    /// capture. Only a failed capture is an error; the snapshot is then left
    /// as it was.
    pub async fn process_source(&self, source: &SourceConfig) -> Result<SourceOutcome> {
        let key = source.storage_key();

        let raw = self.renderer.capture(&CaptureRequest::from(source)).await?;
        if raw.partial {
            tracing::warn!("Page load timed out, diffing partial capture");
        }

        let current = parse_capture(&raw.names, &raw.prices);
        if current.is_empty() {
            tracing::warn!("Capture contains no items");
        }

        let previous = match self.store.load(&key) {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!("Ignoring unreadable snapshot '{}': {}", key, e);
                None
            }
        };

        let first_capture = previous.is_none();
        let changes = match &previous {
            Some(previous) => {
                let pairs = diff(previous, &current);
                let changes = filter(&source.name, &pairs, self.config.threshold_for(source));
                tracing::debug!(
                    captured = current.len(),
                    matched = pairs.len(),
                    changed = changes.len(),
                    "Diffed against previous snapshot"
                );
                changes
            }
            None => {
                tracing::info!("No previous snapshot, storing first capture");
                Vec::new()
            }
        };

        let snapshot_saved = match self.store.save(&key, &current) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to save snapshot '{}': {}", key, e);
                false
            }
        };

        Ok(SourceOutcome {
            source: source.name.clone(),
            items_captured: current.len(),
            first_capture,
            snapshot_saved,
            changes,
        })
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
