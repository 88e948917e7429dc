//! Run coordinator: drives the frontier to completion.
//!
//! A bounded pool of workers pulls tasks, performs one fetch+handle
//! cycle each, and reports the outcome back to the frontier. Failure
//! kind decides retry vs. permanent failure; no single task aborts the
//! run. State (stats, seen item ids, frontier) is persisted on a fixed
//! interval and once more at shutdown, so a resumed run does not
//! re-emit already-captured products.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::crawl_engine::frontier::{Dispatch, FailureVerdict, Frontier, FrontierSnapshot};
use crate::crawl_engine::ledger::ItemLedger;
use crate::crawl_engine::router::{PageLimits, Router};
use crate::domain::errors::TaskResult;
use crate::domain::services::{FetchHints, Fetcher, ProductSink, SiteAdapter};
use crate::domain::stats::{RunStats, StatsSnapshot};
use crate::domain::task::CrawlTask;

/// Engine tuning knobs, resolved from the run configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Last page index the site will serve for one listing/filter view.
    pub page_cap: u32,
    /// Items per listing page.
    pub page_size: u32,
    /// Maximum number of tasks in flight simultaneously.
    pub concurrency: usize,
    /// Retry bound per task for retryable failures.
    pub max_retries: u32,
    /// Fixed persistence tick, independent of task completion.
    pub persist_interval: Duration,
    /// How long an idle worker waits before polling the frontier again.
    pub queue_poll_interval: Duration,
    /// Base of the exponential retry backoff.
    pub retry_backoff_base: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            page_cap: 100,
            page_size: 60,
            concurrency: 10,
            max_retries: 3,
            persist_interval: Duration::from_secs(60),
            queue_poll_interval: Duration::from_millis(100),
            retry_backoff_base: Duration::from_millis(500),
        }
    }
}

/// Persisted state of a run, written atomically at each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
    pub stats: StatsSnapshot,
    pub seen_item_ids: Vec<String>,
    pub frontier: FrontierSnapshot,
}

/// Persistence collaborator. Reading a missing or corrupt snapshot is
/// equivalent to starting fresh, never an error.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Option<RunSnapshot>;
    async fn save(&self, snapshot: &RunSnapshot) -> anyhow::Result<()>;
}

/// Final report of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub cancelled: bool,
    pub stats: StatsSnapshot,
}

pub struct RunCoordinator {
    settings: EngineSettings,
    session_id: String,
    frontier: Arc<Frontier>,
    router: Arc<Router>,
    fetcher: Arc<dyn Fetcher>,
    adapter: Arc<dyn SiteAdapter>,
    ledger: Arc<ItemLedger>,
    stats: Arc<RunStats>,
    store: Option<Arc<dyn StateStore>>,
    cancel: CancellationToken,
}

impl RunCoordinator {
    pub fn new(
        settings: EngineSettings,
        adapter: Arc<dyn SiteAdapter>,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn ProductSink>,
        store: Option<Arc<dyn StateStore>>,
    ) -> Self {
        let stats = Arc::new(RunStats::new());
        let frontier = Arc::new(Frontier::new(settings.max_retries));
        let ledger = Arc::new(ItemLedger::new(sink, Arc::clone(&stats)));
        let router = Arc::new(Router::new(
            Arc::clone(&adapter),
            Arc::clone(&frontier),
            Arc::clone(&ledger),
            Arc::clone(&stats),
            PageLimits {
                page_cap: settings.page_cap,
                page_size: settings.page_size,
            },
        ));
        Self {
            settings,
            session_id: Uuid::new_v4().to_string(),
            frontier,
            router,
            fetcher,
            adapter,
            ledger,
            stats,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Token for wiring an external shutdown signal. Cancelling stops
    /// new fetches; in-flight work finishes and final state is still
    /// persisted.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Seed the frontier with the configured entry tasks; returns how
    /// many were new (a resumed run already knows its seeds).
    pub async fn seed(&self, tasks: Vec<CrawlTask>) -> u64 {
        self.frontier.add_all(tasks).await
    }

    /// Prime ledger, stats and frontier from a persisted snapshot.
    pub async fn resume_from(&self, snapshot: RunSnapshot) {
        info!(
            "♻️ resuming from snapshot of session {} ({} items seen, {} tasks pending)",
            snapshot.session_id,
            snapshot.seen_item_ids.len(),
            snapshot.frontier.pending.len()
        );
        self.stats.restore(&snapshot.stats);
        self.ledger.restore(snapshot.seen_item_ids).await;
        self.frontier.restore(snapshot.frontier).await;
    }

    /// Drive the frontier until drained (or cancelled), then persist
    /// and report.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<RunSummary> {
        let started_at = Utc::now();
        info!(
            "🚀 session {}: starting {} workers (page cap {}, page size {})",
            self.session_id,
            self.settings.concurrency,
            self.settings.page_cap,
            self.settings.page_size
        );

        let persist_guard = CancellationToken::new();
        let persist_handle = self.store.as_ref().map(|_| {
            let me = Arc::clone(&self);
            let done = persist_guard.clone();
            tokio::spawn(async move { me.persist_loop(done).await })
        });

        let workers: Vec<_> = (0..self.settings.concurrency)
            .map(|worker_id| {
                let me = Arc::clone(&self);
                tokio::spawn(async move { me.worker_loop(worker_id).await })
            })
            .collect();
        for worker in workers {
            worker.await?;
        }

        persist_guard.cancel();
        if let Some(handle) = persist_handle {
            handle.await?;
        }
        if let Err(err) = self.persist().await {
            warn!("final persistence failed: {err}");
        }

        let finished_at = Utc::now();
        let cancelled = self.cancel.is_cancelled();
        let summary = RunSummary {
            session_id: self.session_id.clone(),
            started_at,
            finished_at,
            duration_secs: (finished_at - started_at).num_seconds().max(0) as u64,
            cancelled,
            stats: self.stats.snapshot(),
        };
        if cancelled {
            info!("🛑 session {} cancelled after {}s", self.session_id, summary.duration_secs);
        } else {
            info!("✅ session {} complete in {}s", self.session_id, summary.duration_secs);
        }
        Ok(summary)
    }

    async fn worker_loop(&self, worker_id: usize) {
        debug!("👷 worker {worker_id} started");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.frontier.next().await {
                Dispatch::Task(task) => {
                    if let Some(backoff) = self.process(task).await {
                        tokio::select! {
                            () = tokio::time::sleep(backoff) => {}
                            () = self.cancel.cancelled() => {}
                        }
                    }
                }
                Dispatch::Idle => {
                    tokio::select! {
                        () = tokio::time::sleep(self.settings.queue_poll_interval) => {}
                        () = self.cancel.cancelled() => {}
                    }
                }
                Dispatch::Drained => break,
            }
        }
        debug!("👷 worker {worker_id} finished");
    }

    /// One fetch+handle cycle. Returns a backoff to wait out before the
    /// worker pulls again, when the task was re-queued for retry.
    async fn process(&self, task: CrawlTask) -> Option<Duration> {
        let hints = FetchHints {
            render_mode: self.adapter.render_mode(task.label),
        };
        let outcome: TaskResult<()> = async {
            let page = self.fetcher.fetch(&task.url, &hints).await?;
            self.router.handle(&task, &page).await
        }
        .await;

        match outcome {
            Ok(()) => {
                self.frontier.mark_done(&task).await;
                None
            }
            Err(err) => {
                let retryable = err.is_retryable();
                let label = task.label;
                let url = task.url.clone();
                match self.frontier.mark_failed(task, retryable).await {
                    FailureVerdict::Requeued { attempt } => {
                        info!(
                            "🔄 [{label}] {url}: {err} — retry {attempt}/{}",
                            self.settings.max_retries
                        );
                        Some(self.backoff_delay(attempt))
                    }
                    FailureVerdict::Exhausted => {
                        self.stats.inc_failed();
                        warn!("❌ [{label}] {url} permanently failed: {err}");
                        None
                    }
                }
            }
        }
    }

    /// Exponential backoff with jitter, capped at one minute.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.settings.retry_backoff_base.as_millis() as u64;
        let exponential = base.saturating_mul(1_u64 << attempt.saturating_sub(1).min(16));
        let jitter = fastrand::u64(0..=base / 2);
        Duration::from_millis((exponential + jitter).min(60_000))
    }

    async fn persist_loop(&self, done: CancellationToken) {
        let mut interval = tokio::time::interval(self.settings.persist_interval);
        // The first tick fires immediately; skip it, the run just started.
        interval.tick().await;
        loop {
            tokio::select! {
                () = done.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(err) = self.persist().await {
                        warn!("persistence failed, continuing with in-memory state: {err}");
                    }
                }
            }
        }
    }

    async fn persist(&self) -> anyhow::Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let snapshot = RunSnapshot {
            session_id: self.session_id.clone(),
            saved_at: Utc::now(),
            stats: self.stats.snapshot(),
            seen_item_ids: self.ledger.seen_snapshot().await,
            frontier: self.frontier.snapshot().await,
        };
        store.save(&snapshot).await?;
        debug!(
            "[PERSIST] {} unique products, {} pending tasks",
            snapshot.seen_item_ids.len(),
            snapshot.frontier.pending.len()
        );
        Ok(())
    }
}
