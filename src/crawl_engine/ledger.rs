//! Item ledger: run-wide product dedup and accounting.
//!
//! The same product is reachable through several category paths and,
//! at range boundaries, through two price sub-ranges; the ledger
//! guarantees the sink sees each distinct item id exactly once per run.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::product::ProductRecord;
use crate::domain::services::ProductSink;
use crate::domain::stats::RunStats;

/// Verdict of [`ItemLedger::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    Duplicate,
}

pub struct ItemLedger {
    /// Item ids seen this run. The lock is held across the sink call so
    /// check-insert-emit is one atomic step: a concurrent duplicate can
    /// never slip through, and a failed emit unpublishes the id before
    /// anyone else observed it.
    seen: Mutex<HashSet<String>>,
    sink: Arc<dyn ProductSink>,
    stats: Arc<RunStats>,
}

impl ItemLedger {
    pub fn new(sink: Arc<dyn ProductSink>, stats: Arc<RunStats>) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            sink,
            stats,
        }
    }

    /// Offer an extracted record: emit it if the item id is new this
    /// run, drop it as a duplicate otherwise. A duplicate is a normal
    /// outcome, the fetch that produced it still counts as successful.
    pub async fn offer(&self, record: ProductRecord) -> anyhow::Result<Offer> {
        let mut seen = self.seen.lock().await;
        if seen.contains(&record.item_id) {
            self.stats.inc_items_duplicity();
            return Ok(Offer::Duplicate);
        }
        if record.price_inverted() {
            warn!(
                item_id = %record.item_id,
                current = ?record.current_price,
                original = ?record.original_price,
                "original price below current price, flagging for review"
            );
        }
        seen.insert(record.item_id.clone());
        if let Err(err) = self.sink.emit(&record).await {
            seen.remove(&record.item_id);
            return Err(err);
        }
        self.stats.inc_items();
        Ok(Offer::Accepted)
    }

    pub async fn seen_count(&self) -> usize {
        self.seen.lock().await.len()
    }

    /// Seen-id set for the persisted snapshot.
    pub async fn seen_snapshot(&self) -> Vec<String> {
        self.seen.lock().await.iter().cloned().collect()
    }

    /// Prime the seen set when resuming so already-captured products
    /// are not re-emitted.
    pub async fn restore(&self, item_ids: Vec<String>) {
        let mut seen = self.seen.lock().await;
        seen.extend(item_ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Default)]
    struct RecordingSink {
        emitted: TokioMutex<Vec<String>>,
        fail_next: TokioMutex<bool>,
    }

    #[async_trait::async_trait]
    impl ProductSink for RecordingSink {
        async fn emit(&self, record: &ProductRecord) -> anyhow::Result<()> {
            if std::mem::take(&mut *self.fail_next.lock().await) {
                anyhow::bail!("sink unavailable");
            }
            self.emitted.lock().await.push(record.item_id.clone());
            Ok(())
        }
    }

    fn record(id: &str) -> ProductRecord {
        ProductRecord {
            item_id: id.into(),
            item_name: format!("Item {id}"),
            item_url: format!("https://shop.example/p/{id}"),
            current_price: Some(99.0),
            original_price: None,
            currency: Some("CZK".into()),
            category: vec![],
            in_stock: true,
            image_url: None,
            discounted: false,
        }
    }

    #[tokio::test]
    async fn test_at_most_once_emission() {
        let sink = Arc::new(RecordingSink::default());
        let stats = Arc::new(RunStats::new());
        let ledger = ItemLedger::new(sink.clone(), stats.clone());

        let offers = ["X", "Y", "X", "X", "Z", "Y"];
        for id in offers {
            ledger.offer(record(id)).await.unwrap();
        }

        let emitted = sink.emitted.lock().await.clone();
        assert_eq!(emitted, vec!["X", "Y", "Z"]);
        let snap = stats.snapshot();
        assert_eq!(snap.items, 3);
        // duplicates == total offers - distinct ids
        assert_eq!(snap.items_duplicity, offers.len() as u64 - 3);
    }

    #[tokio::test]
    async fn test_failed_emit_unpublishes_id() {
        let sink = Arc::new(RecordingSink::default());
        let stats = Arc::new(RunStats::new());
        let ledger = ItemLedger::new(sink.clone(), stats.clone());

        *sink.fail_next.lock().await = true;
        assert!(ledger.offer(record("X")).await.is_err());
        assert_eq!(stats.snapshot().items, 0);

        // The retry re-offers the same record and it goes through.
        assert_eq!(ledger.offer(record("X")).await.unwrap(), Offer::Accepted);
        assert_eq!(stats.snapshot().items, 1);
        assert_eq!(stats.snapshot().items_duplicity, 0);
    }

    #[tokio::test]
    async fn test_restore_skips_prior_items() {
        let sink = Arc::new(RecordingSink::default());
        let stats = Arc::new(RunStats::new());
        let ledger = ItemLedger::new(sink.clone(), stats);

        ledger.restore(vec!["X".into(), "Y".into()]).await;
        assert_eq!(ledger.offer(record("X")).await.unwrap(), Offer::Duplicate);
        assert_eq!(ledger.offer(record("Z")).await.unwrap(), Offer::Accepted);
        assert_eq!(sink.emitted.lock().await.clone(), vec!["Z"]);
    }
}
