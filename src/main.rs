use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use price_sentinel::config::LoggingConfig;
use price_sentinel::core::snapshot::SnapshotStore;
use price_sentinel::plugins::TelegramNotifier;
use price_sentinel::scraper::ChromeRenderer;
use price_sentinel::{AppConfig, Runner};

/// Checks every configured page once and reports price changes to Telegram.
#[derive(Parser)]
#[command(version, about)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    Cli::parse();
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let _guard = init_tracing(&LoggingConfig::default())?;
            tracing::error!("Invalid configuration: {}", e);
            return Err(e).context("Failed to load configuration");
        }
    };
    let _guard = init_tracing(&config.logging)?;

    info!("Starting Price Sentinel with {} sources", config.sources.len());

    let renderer = ChromeRenderer::new(config.scraper.clone());
    let store = SnapshotStore::from_config(&config.storage);
    let notifier = TelegramNotifier::new(config.telegram.clone());

    let summary = Runner::new(&config, &renderer, &store, &notifier)
        .run()
        .await
        .context("Price check failed")?;

    match &summary.notification {
        Some(notification) => info!(
            "Reported {} changes (message {})",
            notification.records_sent,
            notification.message_id.as_deref().unwrap_or("unknown")
        ),
        None => info!("Nothing to report"),
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("price_sentinel={}", logging.level)))?;

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "price-sentinel.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
