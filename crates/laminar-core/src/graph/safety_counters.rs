//! Always-on diagnostic counters, independent of the logging subsystem.
//!
//! These are consulted by tests and diagnostics, never by control flow:
//! a lock-order violation is recorded here but the operation proceeds
//! (the rank check is advisory, not enforced).

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct SafetyCounters {
    invariant_violation_total: AtomicU64,
    corruption_detected_total: AtomicU64,
}

/// A point-in-time read of the always-on lock-order and corruption
/// counters, returned by [`crate::graph::Index::diagnostics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSnapshot {
    /// Times a thread acquired a lock whose rank was not strictly
    /// higher than the highest rank it already held.
    pub invariant_violation_total: u64,
    /// Times a lock was released out of the order it was acquired in.
    pub corruption_detected_total: u64,
}

impl SafetyCounters {
    pub(crate) const fn new() -> Self {
        Self {
            invariant_violation_total: AtomicU64::new(0),
            corruption_detected_total: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_invariant_violation(&self) {
        self.invariant_violation_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_corruption(&self) {
        self.corruption_detected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            invariant_violation_total: self.invariant_violation_total.load(Ordering::Relaxed),
            corruption_detected_total: self.corruption_detected_total.load(Ordering::Relaxed),
        }
    }
}

pub(crate) static COUNTERS: SafetyCounters = SafetyCounters::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_starts_at_zero() {
        let c = SafetyCounters::new();
        let s = c.snapshot();
        assert_eq!(s.invariant_violation_total, 0);
        assert_eq!(s.corruption_detected_total, 0);
    }
}
