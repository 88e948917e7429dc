//! Deduplicated crawl frontier.
//!
//! Owns every task ever created for the run plus the subset not yet
//! completed. A `dedupe_key` is admitted at most once for the lifetime
//! of the run; re-adding is a no-op. Check-and-insert is serialized
//! behind one async mutex so two in-flight handlers racing to add the
//! same key can never both succeed.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::task::CrawlTask;

/// What the coordinator gets when it asks for work.
#[derive(Debug)]
pub enum Dispatch {
    /// An unclaimed task, now accounted as in flight.
    Task(CrawlTask),
    /// Nothing pending, but handlers are still in flight — new tasks
    /// may yet appear.
    Idle,
    /// No pending and no in-flight tasks remain; terminal.
    Drained,
}

/// Outcome of a failure report.
#[derive(Debug, PartialEq, Eq)]
pub enum FailureVerdict {
    /// Re-queued for another attempt (attempt number is 1-based).
    Requeued { attempt: u32 },
    /// Retry budget spent or failure not retryable; task is dropped
    /// and must be counted as permanently failed by the caller.
    Exhausted,
}

#[derive(Debug, Default)]
struct FrontierState {
    seen: HashSet<String>,
    pending: VecDeque<CrawlTask>,
    in_flight: HashMap<String, CrawlTask>,
    attempts: HashMap<String, u32>,
}

/// Serialized frontier state; in-flight tasks at snapshot time are
/// folded back into pending so a resumed run re-tries them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontierSnapshot {
    pub seen: Vec<String>,
    pub pending: Vec<CrawlTask>,
}

/// Durable, deduplicated queue of pending crawl tasks.
pub struct Frontier {
    state: Mutex<FrontierState>,
    max_retries: u32,
}

impl Frontier {
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            max_retries,
        }
    }

    /// Insert a task if its dedupe key is unseen; returns whether it
    /// was newly added.
    pub async fn add(&self, task: CrawlTask) -> bool {
        let key = task.dedupe_key();
        let mut state = self.state.lock().await;
        if !state.seen.insert(key) {
            debug!("frontier: skipping already seen task {} {}", task.label, task.url);
            return false;
        }
        state.pending.push_back(task);
        true
    }

    /// Insert many tasks; returns how many were newly added.
    pub async fn add_all(&self, tasks: Vec<CrawlTask>) -> u64 {
        let mut added = 0;
        for task in tasks {
            if self.add(task).await {
                added += 1;
            }
        }
        added
    }

    /// Claim the next unclaimed task, or report the frontier state.
    pub async fn next(&self) -> Dispatch {
        let mut state = self.state.lock().await;
        if let Some(task) = state.pending.pop_front() {
            state.in_flight.insert(task.dedupe_key(), task.clone());
            Dispatch::Task(task)
        } else if state.in_flight.is_empty() {
            Dispatch::Drained
        } else {
            Dispatch::Idle
        }
    }

    /// A task's handler completed successfully.
    pub async fn mark_done(&self, task: &CrawlTask) {
        let key = task.dedupe_key();
        let mut state = self.state.lock().await;
        state.in_flight.remove(&key);
        state.attempts.remove(&key);
    }

    /// A task's handler failed. Retryable failures re-enter the queue
    /// until the retry bound; the task stays "seen" either way so it is
    /// dispatched at most `max_retries + 1` times and never duplicated.
    pub async fn mark_failed(&self, task: CrawlTask, retryable: bool) -> FailureVerdict {
        let key = task.dedupe_key();
        let mut state = self.state.lock().await;
        state.in_flight.remove(&key);
        if !retryable {
            state.attempts.remove(&key);
            return FailureVerdict::Exhausted;
        }
        let attempt = state.attempts.get(&key).copied().unwrap_or(0) + 1;
        if attempt > self.max_retries {
            state.attempts.remove(&key);
            return FailureVerdict::Exhausted;
        }
        state.attempts.insert(key, attempt);
        state.pending.push_back(task);
        FailureVerdict::Requeued { attempt }
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    pub async fn snapshot(&self) -> FrontierSnapshot {
        let state = self.state.lock().await;
        let mut pending: Vec<CrawlTask> = state.pending.iter().cloned().collect();
        pending.extend(state.in_flight.values().cloned());
        FrontierSnapshot {
            seen: state.seen.iter().cloned().collect(),
            pending,
        }
    }

    /// Prime from a persisted snapshot; replaces the current state.
    pub async fn restore(&self, snapshot: FrontierSnapshot) {
        let mut state = self.state.lock().await;
        state.seen = snapshot.seen.into_iter().collect();
        // Seen must cover everything re-queued, even from a snapshot
        // written by an older build.
        for task in &snapshot.pending {
            state.seen.insert(task.dedupe_key());
        }
        state.pending = snapshot.pending.into();
        state.in_flight.clear();
        state.attempts.clear();
    }
}
