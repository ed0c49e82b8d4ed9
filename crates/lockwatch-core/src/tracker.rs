//! Transaction tracker: correlates successive snapshots into per-transaction
//! lock-wait histories and decides, exactly once per tracked lifetime, when
//! a transaction has waited long enough to report.
//!
//! # Lifecycle
//!
//! ```text
//!   first seen in LOCK WAIT ──► tracked (alerted = false)
//!                                  │ waited >= threshold
//!                                  ▼
//!                               tracked (alerted = true)
//!   id missing from snapshot ──► pruned (from either state)
//! ```
//!
//! An entry whose transaction stays active but leaves the lock-wait state
//! keeps its original `started_at` and `alerted` values until it is pruned.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::ActiveTransaction;

/// Continuity state for one transaction seen in lock wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTransaction {
    pub id: String,
    /// Owning session, captured at first sighting
    pub thread_id: u64,
    /// Statement at first sighting; never refreshed
    pub query: Option<String>,
    /// Monotonic time of first sighting in lock wait
    pub started_at: Instant,
    /// Wall-clock time of first sighting, for reports
    pub first_seen: DateTime<Utc>,
    /// Set once an alert has been emitted for this lifetime
    pub alerted: bool,
}

/// Decision that a tracked transaction crossed the wait threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: String,
    pub thread_id: u64,
    pub query: Option<String>,
    /// Time spent waiting when the alert fired
    pub waited: Duration,
    pub first_seen: DateTime<Utc>,
}

/// Owns the `id -> TrackedTransaction` map for the life of the process.
#[derive(Debug, Default)]
pub struct TransactionTracker {
    tracked: HashMap<String, TrackedTransaction>,
}

impl TransactionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one full snapshot using the current clock.
    pub fn process(
        &mut self,
        snapshot: &[ActiveTransaction],
        threshold: Duration,
    ) -> Vec<AlertEvent> {
        self.process_at(snapshot, threshold, Instant::now())
    }

    /// Feed one full snapshot observed at `now`.
    ///
    /// Returns one event for every tracked transaction whose wait reached
    /// `threshold` during this call and had not alerted before. Entries whose
    /// id is absent from `snapshot` are pruned afterwards.
    pub fn process_at(
        &mut self,
        snapshot: &[ActiveTransaction],
        threshold: Duration,
        now: Instant,
    ) -> Vec<AlertEvent> {
        let active: HashSet<&str> = snapshot.iter().map(|trx| trx.id.as_str()).collect();
        let mut events = Vec::new();

        for trx in snapshot.iter().filter(|trx| trx.state.is_lock_wait()) {
            let entry = self.tracked.entry(trx.id.clone()).or_insert_with(|| {
                tracing::debug!(
                    trx_id = %trx.id,
                    thread_id = trx.thread_id,
                    "Tracking lock-waiting transaction"
                );
                TrackedTransaction {
                    id: trx.id.clone(),
                    thread_id: trx.thread_id,
                    query: trx.query.clone(),
                    started_at: now,
                    first_seen: Utc::now(),
                    alerted: false,
                }
            });

            let waited = now.saturating_duration_since(entry.started_at);
            if waited >= threshold && !entry.alerted {
                events.push(AlertEvent {
                    id: entry.id.clone(),
                    thread_id: entry.thread_id,
                    query: entry.query.clone(),
                    waited,
                    first_seen: entry.first_seen,
                });
                entry.alerted = true;
            }
        }

        let before = self.tracked.len();
        self.tracked.retain(|id, _| active.contains(id.as_str()));
        let pruned = before - self.tracked.len();
        if pruned > 0 {
            tracing::debug!(pruned, tracked = self.tracked.len(), "Pruned finished transactions");
        }

        events
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TrackedTransaction> {
        self.tracked.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.tracked.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}
