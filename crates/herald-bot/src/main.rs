use std::sync::Arc;
use std::time::Duration;

use teloxide::Bot;
use tracing::info;

use herald_core::HeraldConfig;
use herald_scheduler::{Engine, EngineConfig, MessageStore};
use herald_telegram::{TelegramAdapter, TelegramTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald=info,herald_scheduler=info,herald_telegram=info".into()),
        )
        .init();

    // load config: explicit path > HERALD_CONFIG env > ~/.herald/herald.toml
    let config_path = std::env::var("HERALD_CONFIG").ok();
    let config = HeraldConfig::load(config_path.as_deref())?;

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    let store = Arc::new(MessageStore::new(db)?);

    let bot = Bot::new(&config.telegram.bot_token);
    let transport = Arc::new(TelegramTransport::new(bot.clone()));

    let engine = Arc::new(Engine::new(
        store,
        transport,
        EngineConfig {
            tick_interval: Duration::from_secs(config.scheduler.tick_interval_secs),
            store_retries: config.scheduler.store_retries,
            store_retry_delay: Duration::from_secs(config.scheduler.store_retry_delay_secs),
        },
    ));

    // Rebuild triggers from durable rows; exhausting the store retries here
    // is fatal by design.
    let report = engine.recover().await?;
    info!(
        loaded = report.loaded,
        skipped = report.skipped,
        "startup recovery finished"
    );

    // Tick loop runs until shutdown is flagged.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(Arc::clone(&engine).run(shutdown_rx));

    // Long-polling dispatcher; returns on ctrl-c.
    let adapter = TelegramAdapter::new(bot, engine, config.scheduler.flow_ttl_secs);
    adapter.run().await;

    let _ = shutdown_tx.send(true);
    info!("herald stopped");
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}
