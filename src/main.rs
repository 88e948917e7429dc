//! Daily crawl entry point.
//!
//! Flow: load + validate configuration, initialize logging, resume from
//! the persisted snapshot when one exists, seed the frontier with the
//! configured entry URLs, drive the run to completion and log the final
//! stats as one JSON line.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use catalog_crawler::crawl_engine::coordinator::{RunCoordinator, StateStore};
use catalog_crawler::infrastructure::{
    init_logging_with_config, ConfigManager, HttpFetcher, JsonlSink, SelectorSiteAdapter,
    SnapshotStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let manager = match std::env::var("CATALOG_CRAWLER_CONFIG") {
        Ok(path) => ConfigManager::with_path(path),
        Err(_) => ConfigManager::new()?,
    };
    let config = manager.initialize().await?;

    // development/debug input raises the log level, as every daily run
    // script expects.
    let mut logging = config.logging.clone();
    if config.crawler.development || config.crawler.debug {
        logging.level = "debug".to_string();
    }
    init_logging_with_config(&logging)?;

    config.validate().context("configuration rejected")?;

    let data_dir = ConfigManager::app_data_dir()?;
    let adapter = Arc::new(SelectorSiteAdapter::new(config.selectors.clone())?);
    let fetcher = Arc::new(HttpFetcher::new(config.http.clone())?);
    let sink = Arc::new(JsonlSink::new(data_dir.join("products.jsonl")));
    let store = Arc::new(SnapshotStore::new(data_dir.join("state.json")));

    let coordinator = Arc::new(RunCoordinator::new(
        config.engine_settings(),
        adapter,
        fetcher,
        sink,
        Some(store.clone() as Arc<dyn StateStore>),
    ));

    // Ctrl-C stops new fetches, lets in-flight work finish, and the
    // final snapshot still gets written.
    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 shutdown signal received, finishing in-flight tasks");
            cancel.cancel();
        }
    });

    if let Some(snapshot) = store.load().await {
        coordinator.resume_from(snapshot).await;
    }
    let seeded = coordinator.seed(config.seed_tasks()).await;
    info!("Seeded {seeded} entry task(s)");

    let summary = coordinator.run().await?;
    info!(
        "[STATS] {}",
        serde_json::to_string(&summary.stats).context("failed to serialize stats")?
    );
    Ok(())
}
