// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Global transfer counters.
//!
//! Four single-location atomics, bumped with `fetch_add`. No mutex: the
//! counters are independent, so relaxed ordering is enough. The join of
//! the workers is the fence that makes final values visible.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Stats {
    successful_transfers: AtomicU64,
    failed_transfers: AtomicU64,
    deadlock_detections: AtomicU64,
    retries: AtomicU64,
}

/// Plain copy of the counters at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub successful_transfers: u64,
    pub failed_transfers: u64,
    pub deadlock_detections: u64,
    pub retries: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.successful_transfers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_transfers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deadlock_detection(&self) {
        self.deadlock_detections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all four counters. Safe at any time; each value is exact, but
    /// during a run the four need not come from the same instant.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            successful_transfers: self.successful_transfers.load(Ordering::Relaxed),
            failed_transfers: self.failed_transfers.load(Ordering::Relaxed),
            deadlock_detections: self.deadlock_detections.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Transfers that reached a verdict, successful or abandoned.
    pub fn settled(&self) -> u64 {
        self.successful_transfers + self.failed_transfers
    }

    /// True if no counter in `self` is below its value in `earlier`.
    pub fn dominates(&self, earlier: &StatsSnapshot) -> bool {
        self.successful_transfers >= earlier.successful_transfers
            && self.failed_transfers >= earlier.failed_transfers
            && self.deadlock_detections >= earlier.deadlock_detections
            && self.retries >= earlier.retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counters_start_at_zero() {
        assert_eq!(Stats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stats = Arc::new(Stats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_success();
                        stats.record_retry();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snap = stats.snapshot();
        assert_eq!(snap.successful_transfers, 8000);
        assert_eq!(snap.retries, 8000);
        assert_eq!(snap.failed_transfers, 0);
        assert_eq!(snap.settled(), 8000);
    }

    #[test]
    fn dominance_is_per_counter() {
        let a = StatsSnapshot { successful_transfers: 3, retries: 1, ..Default::default() };
        let b = StatsSnapshot { successful_transfers: 4, retries: 0, ..Default::default() };
        assert!(!b.dominates(&a));
        assert!(a.dominates(&a));
    }
}
