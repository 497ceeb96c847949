//! Symmetric connection maintenance: when a new node selects an
//! incumbent as a neighbor, the incumbent's own adjacency is updated to
//! point back, subject to its degree cap.

use super::locking::{record_lock_acquire, record_lock_release, LockRank};
use super::{Index, Level, Node, NodeId, OrderedFloat};
use crate::distance::Metric;
use rustc_hash::FxHashMap;
use std::sync::Arc;

impl<M: Metric> Index<M> {
    /// Installs a back-edge from `neighbor` to `new_id` at `level`,
    /// truncating the neighbor's connection list to its degree cap and
    /// occasionally preserving a long-range link.
    ///
    /// `nodes` is the node table the caller already holds the global
    /// lock for — this method must never re-lock `self.state`, since
    /// both `insert` and the greedy descent that precedes it call this
    /// while the global lock is already held on the current thread.
    /// `neighbor_vector`/`new_vector` are used only to order candidates
    /// by distance to the neighbor itself, never to the original query.
    pub(super) fn install_neighbor(
        &self,
        nodes: &FxHashMap<NodeId, Arc<Node>>,
        neighbor: &Node,
        neighbor_vector: &[f64],
        new_id: NodeId,
        new_vector: &[f64],
        level: usize,
    ) {
        record_lock_acquire(LockRank::Node);
        let mut levels = neighbor.levels.write();
        if levels.len() <= level {
            levels.resize_with(level + 1, Level::default);
        }
        if levels[level].connections.contains(&new_id) {
            record_lock_release(LockRank::Node);
            return;
        }

        let cap = if level == 0 {
            self.params.m_max
        } else {
            self.params.m
        };

        let mut candidates: Vec<(OrderedFloat, NodeId)> = levels[level]
            .connections
            .iter()
            .map(|&id| {
                let dist = if id == new_id {
                    0.0
                } else if let Some(n) = nodes.get(&id) {
                    self.compute_distance(neighbor_vector, &n.vector)
                } else {
                    // Peer vector unavailable (shouldn't happen under the
                    // lock ordering this method is called with); treat as
                    // maximally far so it is first to be evicted.
                    f64::INFINITY
                };
                (OrderedFloat(dist), id)
            })
            .collect();
        candidates.push((
            OrderedFloat(self.compute_distance(neighbor_vector, new_vector)),
            new_id,
        ));
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let overflowed = candidates.len() > cap;
        let farthest = candidates.last().copied();
        candidates.truncate(cap);

        if level > 0 && overflowed {
            if self.next_uniform() < 0.2 {
                if let Some((dist, id)) = farthest {
                    let last = cap - 1;
                    candidates[last] = (dist, id);
                }
            }
        }

        levels[level].connections = candidates.into_iter().map(|(_, id)| id).collect();
        record_lock_release(LockRank::Node);
    }
}

#[cfg(test)]
mod tests {
    use super::super::Index;
    use crate::distance::Euclidean;

    #[test]
    fn neighbor_cap_is_respected_after_many_inserts() {
        let ix: Index<Euclidean> = Index::with_defaults(2).unwrap();
        for i in 0..200u64 {
            ix.insert(i, vec![(i % 20) as f64, (i / 20) as f64]).unwrap();
        }
        let state = ix.state.read();
        for node in state.nodes.values() {
            let levels = node.levels.read();
            for (level, l) in levels.iter().enumerate() {
                let cap = if level == 0 { ix.params.m_max } else { ix.params.m };
                assert!(l.connections.len() <= cap);
            }
        }
    }
}
