//! Poll loop driver.
//!
//! ```text
//! ticker ──► run_cycle
//!              ├── source.ensure_live()
//!              ├── source.active_transactions() ──► tracker.process()
//!              └── for each alert:
//!                    source.running_queries() + source.engine_status()
//!                    ──► AlertReport ──► sink.deliver()
//! ```
//!
//! One cycle finishes completely before the next starts. The first error
//! ends the loop and is returned to the caller.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::report::AlertReport;
use crate::sink::AlertSink;
use crate::snapshot::SnapshotSource;
use crate::tracker::{AlertEvent, TransactionTracker};

/// Counters for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Transactions in the snapshot
    pub active: usize,
    /// Of those, how many were in lock wait
    pub lock_waiting: usize,
    /// Tracked entries after pruning
    pub tracked: usize,
    /// Alerts delivered this cycle
    pub alerts: usize,
}

/// Owns the tracker and drives it from a snapshot source on a fixed cadence.
#[derive(Debug)]
pub struct Monitor<S, K> {
    source: S,
    sink: K,
    tracker: TransactionTracker,
    config: MonitorConfig,
    cycles: u64,
    alerts_sent: u64,
}

impl<S: SnapshotSource, K: AlertSink> Monitor<S, K> {
    #[must_use]
    pub fn new(source: S, sink: K, config: MonitorConfig) -> Self {
        Self {
            source,
            sink,
            tracker: TransactionTracker::new(),
            config,
            cycles: 0,
            alerts_sent: 0,
        }
    }

    /// Execute one poll cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.source.ensure_live().await?;
        let snapshot = self.source.active_transactions().await?;

        let lock_waiting = snapshot
            .iter()
            .filter(|trx| trx.state.is_lock_wait())
            .count();
        let events = self.tracker.process(&snapshot, self.config.wait_threshold);

        for event in &events {
            self.report(event).await?;
        }

        self.cycles += 1;
        let cycle = CycleReport {
            active: snapshot.len(),
            lock_waiting,
            tracked: self.tracker.len(),
            alerts: events.len(),
        };
        debug!(
            active = cycle.active,
            lock_waiting = cycle.lock_waiting,
            tracked = cycle.tracked,
            alerts = cycle.alerts,
            "Poll cycle complete"
        );
        Ok(cycle)
    }

    async fn report(&mut self, event: &AlertEvent) -> Result<()> {
        warn!(
            trx_id = %event.id,
            thread_id = event.thread_id,
            waited_secs = event.waited.as_secs(),
            threshold_secs = self.config.wait_threshold.as_secs(),
            "Transaction exceeded lock wait threshold"
        );

        // Diagnostics are read now, not at snapshot time.
        let running = self.source.running_queries().await?;
        let status = self.source.engine_status().await?;
        let report = AlertReport::new(event, running, status);

        self.sink.deliver(&report.render()).await?;
        self.alerts_sent += 1;
        info!(trx_id = %event.id, sink = %self.sink.describe(), "Alert written");
        Ok(())
    }

    /// Poll forever. Returns only when a cycle fails.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            threshold_secs = self.config.wait_threshold.as_secs(),
            interval_secs = self.config.poll_interval.as_secs(),
            sink = %self.sink.describe(),
            "Watching for lock waits"
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_cycle().await?;
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &TransactionTracker {
        &self.tracker
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub fn alerts_sent(&self) -> u64 {
        self.alerts_sent
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn sink(&self) -> &K {
        &self.sink
    }
}
