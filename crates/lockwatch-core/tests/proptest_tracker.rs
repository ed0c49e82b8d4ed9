//! Property-based tests for the transaction tracker.
//!
//! Verifies tracker invariants over random snapshot sequences:
//! - Prune: an id absent from the latest snapshot is never tracked afterwards
//! - Membership: tracked ids were all seen in lock wait and are still active
//! - Alert-once: at most one alert per unbroken tracked lifetime
//! - Timing: a continuously waiting transaction alerts at the first cycle
//!   whose elapsed time reaches the threshold, never before
//! - Recycle: an id that reappears after pruning can alert again

use std::collections::HashMap;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use lockwatch_core::snapshot::{ActiveTransaction, TrxState};
use lockwatch_core::tracker::TransactionTracker;

// ────────────────────────────────────────────────────────────────────
// Strategies
// ────────────────────────────────────────────────────────────────────

fn arb_state() -> impl Strategy<Value = TrxState> {
    prop_oneof![
        3 => Just(TrxState::LockWait),
        2 => Just(TrxState::Running),
        1 => Just(TrxState::RollingBack),
        1 => Just(TrxState::Committing),
    ]
}

/// A snapshot over a small id space so ids recur across cycles.
fn arb_snapshot() -> impl Strategy<Value = Vec<ActiveTransaction>> {
    prop::collection::btree_map(0u8..6, arb_state(), 0..6).prop_map(|rows| {
        rows.into_iter()
            .map(|(id, state)| {
                ActiveTransaction::new(
                    format!("trx-{id}"),
                    state,
                    u64::from(id) + 100,
                    Some(format!("update t set v = v + 1 where k = {id}")),
                )
            })
            .collect()
    })
}

/// Snapshot sequence plus the gap (seconds) before each cycle.
fn arb_history() -> impl Strategy<Value = Vec<(u64, Vec<ActiveTransaction>)>> {
    prop::collection::vec((0u64..4, arb_snapshot()), 1..30)
}

// ────────────────────────────────────────────────────────────────────
// Prune / membership / alert-once
// ────────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// After each cycle every tracked id is present in that cycle's snapshot.
    #[test]
    fn prop_tracked_ids_are_active(history in arb_history(), threshold in 0u64..6) {
        let mut tracker = TransactionTracker::new();
        let mut now = Instant::now();
        for (gap, snapshot) in &history {
            now += Duration::from_secs(*gap);
            tracker.process_at(snapshot, Duration::from_secs(threshold), now);
            for id in 0u8..6 {
                let id = format!("trx-{id}");
                if tracker.contains(&id) {
                    prop_assert!(snapshot.iter().any(|trx| trx.id == id),
                        "{} tracked but absent from snapshot", id);
                }
            }
        }
    }

    /// An id enters the map only when seen in lock wait.
    #[test]
    fn prop_untracked_until_lock_wait(history in arb_history()) {
        let mut tracker = TransactionTracker::new();
        let mut lifetime_saw_wait: HashMap<String, bool> = HashMap::new();
        let mut now = Instant::now();
        for (gap, snapshot) in &history {
            now += Duration::from_secs(*gap);
            let active: Vec<&str> = snapshot.iter().map(|t| t.id.as_str()).collect();
            lifetime_saw_wait.retain(|id, _| active.contains(&id.as_str()));
            for trx in snapshot.iter().filter(|t| t.state.is_lock_wait()) {
                lifetime_saw_wait.insert(trx.id.clone(), true);
            }
            tracker.process_at(snapshot, Duration::from_secs(60), now);
            for trx in snapshot {
                prop_assert_eq!(
                    tracker.contains(&trx.id),
                    lifetime_saw_wait.get(&trx.id).copied().unwrap_or(false)
                );
            }
        }
    }

    /// No id alerts twice without being pruned in between.
    #[test]
    fn prop_at_most_one_alert_per_lifetime(history in arb_history(), threshold in 0u64..6) {
        let mut tracker = TransactionTracker::new();
        let mut alerted_in_lifetime: HashMap<String, bool> = HashMap::new();
        let mut now = Instant::now();
        for (gap, snapshot) in &history {
            now += Duration::from_secs(*gap);
            let events = tracker.process_at(snapshot, Duration::from_secs(threshold), now);
            for event in &events {
                let previously = alerted_in_lifetime.insert(event.id.clone(), true);
                prop_assert!(previously != Some(true), "{} alerted twice", event.id);
                prop_assert!(event.waited >= Duration::from_secs(threshold));
            }
            alerted_in_lifetime.retain(|id, _| tracker.contains(id));
        }
    }
}

// ────────────────────────────────────────────────────────────────────
// Timing / recycle
// ────────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A transaction waiting continuously alerts exactly at the first cycle
    /// whose elapsed time reaches the threshold.
    #[test]
    fn prop_alert_at_first_cycle_past_threshold(
        gaps in prop::collection::vec(1u64..5, 1..25),
        threshold in 0u64..30,
    ) {
        let mut tracker = TransactionTracker::new();
        let waiting = [ActiveTransaction::new("x", TrxState::LockWait, 1, None)];
        let t0 = Instant::now();
        let mut alerts = Vec::new();

        alerts.push(tracker.process_at(&waiting, Duration::from_secs(threshold), t0).len());
        let mut elapsed = 0;
        let mut elapsed_at_cycle = vec![0];
        for gap in &gaps {
            elapsed += gap;
            elapsed_at_cycle.push(elapsed);
            let now = t0 + Duration::from_secs(elapsed);
            alerts.push(tracker.process_at(&waiting, Duration::from_secs(threshold), now).len());
        }

        let expected = elapsed_at_cycle.iter().position(|e| *e >= threshold);
        let actual = alerts.iter().position(|n| *n == 1);
        prop_assert_eq!(actual, expected);
        prop_assert!(alerts.iter().sum::<usize>() <= 1);
    }

    /// Disappearing and reappearing starts a new lifetime that may alert again.
    #[test]
    fn prop_recycled_id_alerts_again(threshold in 0u64..10, absent_cycles in 1usize..4) {
        let mut tracker = TransactionTracker::new();
        let waiting = [ActiveTransaction::new("x", TrxState::LockWait, 1, None)];
        let threshold = Duration::from_secs(threshold);
        let mut now = Instant::now();

        let on_first_sighting = tracker.process_at(&waiting, threshold, now).len();
        now += threshold;
        let at_threshold = tracker.process_at(&waiting, threshold, now).len();
        prop_assert_eq!(on_first_sighting + at_threshold, 1);

        for _ in 0..absent_cycles {
            now += Duration::from_secs(1);
            tracker.process_at(&[], threshold, now);
        }
        prop_assert!(!tracker.contains("x"));

        now += Duration::from_secs(1);
        let on_return = tracker.process_at(&waiting, threshold, now).len();
        now += threshold;
        let later = tracker.process_at(&waiting, threshold, now).len();
        prop_assert_eq!(on_return + later, 1);
    }
}
