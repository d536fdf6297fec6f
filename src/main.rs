use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use feedbell::bot::{spawn_poller, CommandHandler, UpdatePoller};
use feedbell::datetime::{now_in, parse_timezone};
use feedbell::scan::spawn_scheduler;
use feedbell::{
    Config, Database, HttpFeedSource, Result, ScanCoordinator, SqliteStore, SubscriptionService,
    TelegramClient,
};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = feedbell::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedbell::logging::init_console_only(&config.logging.level);
    }

    info!("feedbell - RSS/Atom notifications for chat");

    if let Err(e) = run(config).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;
    let tz = parse_timezone(&config.scan.timezone)?;

    let db = Database::open(&config.database.path).await?;
    info!("Database opened at {}", config.database.path);

    let store = Arc::new(SqliteStore::new(db.clone()));
    store.bootstrap(now_in(&tz).fixed_offset()).await?;

    let source = Arc::new(HttpFeedSource::from_config(&config.scan)?);
    let telegram = TelegramClient::new(&config.bot)?;

    let coordinator = Arc::new(
        ScanCoordinator::new(
            store.clone(),
            source.clone(),
            Arc::new(telegram.clone()),
            tz,
        )
        .with_fetch_timeout(Duration::from_secs(config.scan.fetch_timeout_secs)),
    );

    let service = Arc::new(
        SubscriptionService::new(store, source).with_latest_items(config.scan.latest_items),
    );
    let poller = UpdatePoller::new(
        telegram,
        Arc::new(CommandHandler::new(service)),
        config.bot.poll_timeout_secs,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = spawn_scheduler(coordinator, config.scan.interval_secs, shutdown_rx.clone());
    let poller = spawn_poller(poller, shutdown_rx);

    info!(
        "Scanning every {} seconds in {}",
        config.scan.interval_secs, config.scan.timezone
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    let _ = shutdown_tx.send(true);

    let grace = Duration::from_secs(config.scan.shutdown_grace_secs);
    let drained = tokio::time::timeout(grace, async {
        let _ = scheduler.await;
        let _ = poller.await;
    })
    .await;
    if drained.is_err() {
        warn!(
            "Background tasks did not stop within {} seconds",
            grace.as_secs()
        );
    }

    db.close().await;
    info!("feedbell stopped");
    Ok(())
}
