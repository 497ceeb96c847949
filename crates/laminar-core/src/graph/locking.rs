//! Lock-rank enforcement for the two-level lock hierarchy.
//!
//! The global order is: index-global lock, then per-node lock. A thread
//! never acquires a second per-node lock while holding a per-node lock,
//! and never re-acquires the global lock after taking a per-node lock.
//! This module tracks acquisitions on a thread-local stack and bumps a
//! safety counter (never panics) if the order is violated, so regressions
//! show up in tests instead of as a production deadlock.

use super::safety_counters::COUNTERS;
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub(crate) enum LockRank {
    /// Index-global reader/writer lock — acquired first.
    Global = 10,
    /// Per-node reader/writer lock over `levels` — acquired second.
    Node = 20,
}

thread_local! {
    static LOCK_RANK_STACK: RefCell<Vec<LockRank>> = const { RefCell::new(Vec::new()) };
}

#[inline]
pub(crate) fn record_lock_acquire(rank: LockRank) {
    LOCK_RANK_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if let Some(&highest) = stack.last() {
            if rank <= highest {
                COUNTERS.record_invariant_violation();
                tracing::debug!(?rank, held = ?highest, "lock-order violation");
            }
        }
        stack.push(rank);
    });
}

#[inline]
pub(crate) fn record_lock_release(rank: LockRank) {
    LOCK_RANK_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.pop() {
            Some(top) if top != rank => COUNTERS.record_corruption(),
            _ => {}
        }
    });
}

#[cfg(test)]
pub(crate) fn lock_depth() -> usize {
    LOCK_RANK_STACK.with(|stack| stack.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_acquire_release_empties_stack() {
        record_lock_acquire(LockRank::Global);
        record_lock_acquire(LockRank::Node);
        assert_eq!(lock_depth(), 2);
        record_lock_release(LockRank::Node);
        record_lock_release(LockRank::Global);
        assert_eq!(lock_depth(), 0);
    }
}
