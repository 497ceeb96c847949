//! Tombstone-based deletion. Incoming edges are never rewritten; result
//! filtering at query time is what keeps deleted ids out of answers
//! (see the crate's Open Question notes on long-term graph degradation).

use super::locking::{record_lock_acquire, record_lock_release, LockRank};
use super::Index;
use crate::distance::Metric;

impl<M: Metric> Index<M> {
    /// Removes `id` from the index. No-op if `id` is absent. If `id` was
    /// the entry point, repoints to the numerically lowest remaining id
    /// for determinism (the reference index picks an arbitrary map
    /// entry; this crate deviates deliberately — see DESIGN.md).
    pub fn delete(&self, id: u64) {
        record_lock_acquire(LockRank::Global);
        let mut state = self.state.write();
        if state.nodes.remove(&id).is_none() {
            record_lock_release(LockRank::Global);
            return;
        }
        state.deleted_ids.insert(id);

        if state.entry_point == Some(id) {
            state.entry_point = state.nodes.keys().min().copied();
            if state.entry_point.is_none() {
                state.max_level = 0;
            }
        }
        record_lock_release(LockRank::Global);
        tracing::debug!(id, "deleted node");
    }
}
