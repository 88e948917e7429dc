//! Run-wide crawl statistics.
//!
//! Counters are independent atomics: workers increment per event and
//! only the final totals matter, so no ordering is imposed across
//! workers. The serializable snapshot is what gets persisted each tick
//! and logged as the run summary.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters for one crawl run.
#[derive(Debug, Default)]
pub struct RunStats {
    /// Category URLs discovered and enqueued.
    urls: AtomicU64,
    /// Pagination pages enqueued.
    pages: AtomicU64,
    /// Unique items emitted to the sink.
    items: AtomicU64,
    /// Items dropped as duplicates of an already-seen id.
    items_duplicity: AtomicU64,
    /// Tasks that exhausted retries or failed permanently.
    failed: AtomicU64,
    /// Price-range bisections performed.
    range_splits: AtomicU64,
    /// Single-price buckets that still exceeded the page cap
    /// (documented truncation, not an error).
    range_exhausted: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_urls(&self, n: u64) {
        self.urls.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_pages(&self, n: u64) {
        self.pages.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_items(&self) {
        self.items.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_items_duplicity(&self) {
        self.items_duplicity.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_range_splits(&self) {
        self.range_splits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_range_exhausted(&self) {
        self.range_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn items_count(&self) -> u64 {
        self.items.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            urls: self.urls.load(Ordering::Relaxed),
            pages: self.pages.load(Ordering::Relaxed),
            items: self.items.load(Ordering::Relaxed),
            items_duplicity: self.items_duplicity.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            range_splits: self.range_splits.load(Ordering::Relaxed),
            range_exhausted: self.range_exhausted.load(Ordering::Relaxed),
        }
    }

    /// Prime the counters from a persisted snapshot when resuming.
    pub fn restore(&self, snapshot: &StatsSnapshot) {
        self.urls.store(snapshot.urls, Ordering::Relaxed);
        self.pages.store(snapshot.pages, Ordering::Relaxed);
        self.items.store(snapshot.items, Ordering::Relaxed);
        self.items_duplicity
            .store(snapshot.items_duplicity, Ordering::Relaxed);
        self.failed.store(snapshot.failed, Ordering::Relaxed);
        self.range_splits
            .store(snapshot.range_splits, Ordering::Relaxed);
        self.range_exhausted
            .store(snapshot.range_exhausted, Ordering::Relaxed);
    }
}

/// Point-in-time view of [`RunStats`], serialized for persistence and
/// the end-of-run summary log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub urls: u64,
    pub pages: u64,
    pub items: u64,
    pub items_duplicity: u64,
    pub failed: u64,
    pub range_splits: u64,
    pub range_exhausted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_round_trip() {
        let stats = RunStats::new();
        stats.add_urls(3);
        stats.add_pages(12);
        stats.inc_items();
        stats.inc_items();
        stats.inc_items_duplicity();
        stats.inc_failed();
        stats.inc_range_splits();
        stats.inc_range_exhausted();

        let snap = stats.snapshot();
        assert_eq!(snap.urls, 3);
        assert_eq!(snap.pages, 12);
        assert_eq!(snap.items, 2);
        assert_eq!(snap.items_duplicity, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.range_splits, 1);
        assert_eq!(snap.range_exhausted, 1);

        let restored = RunStats::new();
        restored.restore(&snap);
        assert_eq!(restored.snapshot(), snap);
    }

    #[test]
    fn test_concurrent_increments_commute() {
        let stats = std::sync::Arc::new(RunStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = std::sync::Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.inc_items();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().items, 8000);
    }
}
