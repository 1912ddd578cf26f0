//! Coordinator counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of coordinator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorMetrics {
    /// Transactions begun
    pub begun: u64,
    /// Transactions whose every confirm succeeded
    pub committed: u64,
    /// Transactions whose cancel sweep finished
    pub rolled_back: u64,
    /// Commits aborted by a failing confirm
    pub confirm_failures: u64,
    /// Individual cancel actions that failed during rollback
    pub cancel_failures: u64,
    /// Transactions begun here and not yet resolved
    pub active: u64,
}

impl CoordinatorMetrics {
    /// Fraction of resolved transactions that committed (0.0 - 1.0)
    pub fn commit_rate(&self) -> f64 {
        let resolved = self.committed + self.rolled_back;
        if resolved == 0 {
            0.0
        } else {
            self.committed as f64 / resolved as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    confirm_failures: AtomicU64,
    cancel_failures: AtomicU64,
    active: AtomicU64,
}

impl Counters {
    pub(crate) fn record_begin(&self) {
        self.begun.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
        self.resolve_one();
    }

    pub(crate) fn record_rollback(&self, cancel_failures: u64) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
        self.cancel_failures
            .fetch_add(cancel_failures, Ordering::Relaxed);
        self.resolve_one();
    }

    pub(crate) fn record_confirm_failure(&self) {
        self.confirm_failures.fetch_add(1, Ordering::Relaxed);
    }

    // A record left by an earlier process may be resolved here without a
    // matching begin, so the gauge saturates at zero.
    fn resolve_one(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub(crate) fn snapshot(&self) -> CoordinatorMetrics {
        CoordinatorMetrics {
            begun: self.begun.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            confirm_failures: self.confirm_failures.load(Ordering::Relaxed),
            cancel_failures: self.cancel_failures.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
        }
    }
}
