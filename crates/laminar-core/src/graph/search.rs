//! Greedy descent, the `ef`-bounded layer search, and the public
//! `search`/`search_with_config` entry points.

use super::locking::{record_lock_acquire, record_lock_release, LockRank};
use super::{Index, Node, NodeId, OrderedFloat};
use crate::config::SearchConfig;
use crate::distance::Metric;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

impl<M: Metric> Index<M> {
    /// Deterministic single-best-neighbor hop, repeated until no
    /// neighbor at the current level is strictly closer than `current`.
    /// Used both by `search`'s upper-layer descent and by `insert`'s
    /// descent down to the new node's own top level.
    pub(super) fn greedy_descend(
        &self,
        nodes: &FxHashMap<NodeId, Arc<Node>>,
        start: Arc<Node>,
        query: &[f64],
        from_level: usize,
        down_to_exclusive: usize,
    ) -> Arc<Node> {
        let mut current = start;
        let mut current_dist = self.compute_distance(&current.vector, query);

        if from_level < down_to_exclusive {
            return current;
        }

        for level in (down_to_exclusive..=from_level).rev() {
            loop {
                record_lock_acquire(LockRank::Node);
                let neighbors = current
                    .levels
                    .read()
                    .get(level)
                    .map(|l| l.connections.clone())
                    .unwrap_or_default();
                record_lock_release(LockRank::Node);

                let mut moved = false;
                for nid in neighbors {
                    if let Some(n) = nodes.get(&nid) {
                        let d = self.compute_distance(&n.vector, query);
                        if d < current_dist {
                            current = Arc::clone(n);
                            current_dist = d;
                            moved = true;
                            break;
                        }
                    }
                }
                if !moved {
                    break;
                }
            }
        }
        current
    }

    /// `ef`-bounded best-first search over a single layer, starting from
    /// `entry`. Returns up to `ef` `(id, distance)` pairs, closest first.
    /// If `entry` has no adjacency recorded at `level` (not yet reached
    /// by the graph at construction time), returns `entry` unchanged.
    ///
    /// `config.use_parallel` fans the per-candidate neighbor distance
    /// evaluation out across `config.resolved_workers()` threads; the
    /// bookkeeping around `visited`/`results`/`candidates` stays on the
    /// calling thread, so the result is identical to the sequential path
    /// modulo tie order.
    pub(super) fn search_layer(
        &self,
        nodes: &FxHashMap<NodeId, Arc<Node>>,
        entry: &Arc<Node>,
        query: &[f64],
        ef: usize,
        level: usize,
        config: SearchConfig,
    ) -> Vec<(NodeId, f64)> {
        let entry_has_level = {
            record_lock_acquire(LockRank::Node);
            let has = entry.levels.read().len() > level;
            record_lock_release(LockRank::Node);
            has
        };
        if !entry_has_level {
            let d = self.compute_distance(&entry.vector, query);
            return vec![(entry.id, d)];
        }

        let entry_dist = self.compute_distance(&entry.vector, query);
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        visited.insert(entry.id);

        // Min-heap of candidates to expand, max-heap of best-so-far.
        let mut candidates: BinaryHeap<Reverse<(OrderedFloat, NodeId)>> = BinaryHeap::new();
        candidates.push(Reverse((OrderedFloat(entry_dist), entry.id)));
        let mut results: BinaryHeap<(OrderedFloat, NodeId)> = BinaryHeap::new();
        results.push((OrderedFloat(entry_dist), entry.id));
        let mut furthest_dist = entry_dist;

        let pool = if config.use_parallel {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.resolved_workers())
                .build()
                .ok()
        } else {
            None
        };

        while let Some(Reverse((OrderedFloat(dist), id))) = candidates.pop() {
            if dist > furthest_dist && results.len() >= ef {
                break;
            }
            let Some(node) = nodes.get(&id) else {
                continue;
            };
            record_lock_acquire(LockRank::Node);
            let neighbor_ids = node
                .levels
                .read()
                .get(level)
                .map(|l| l.connections.clone())
                .unwrap_or_default();
            record_lock_release(LockRank::Node);

            // `visited` is not thread-safe; filter sequentially, then fan
            // the actual distance evaluations out if configured to.
            let unvisited: Vec<NodeId> = neighbor_ids
                .into_iter()
                .filter(|nid| visited.insert(*nid))
                .collect();

            let evaluated: Vec<(NodeId, f64)> = match &pool {
                Some(pool) if unvisited.len() > 1 => pool.install(|| {
                    unvisited
                        .par_iter()
                        .filter_map(|&nid| {
                            nodes
                                .get(&nid)
                                .map(|n| (nid, self.compute_distance(&n.vector, query)))
                        })
                        .collect()
                }),
                _ => unvisited
                    .into_iter()
                    .filter_map(|nid| {
                        nodes
                            .get(&nid)
                            .map(|n| (nid, self.compute_distance(&n.vector, query)))
                    })
                    .collect(),
            };

            for (nid, d) in evaluated {
                if results.len() < ef || d < furthest_dist {
                    results.push((OrderedFloat(d), nid));
                    if results.len() > ef {
                        results.pop();
                    }
                    if let Some((OrderedFloat(worst), _)) = results.peek() {
                        furthest_dist = *worst;
                    }
                }
                // Always expand through the neighbor, even when it did
                // not improve the result set: it may still route to a
                // better node further out.
                candidates.push(Reverse((OrderedFloat(d), nid)));
            }
        }

        let mut out: Vec<(NodeId, f64)> = results.into_iter().map(|(OrderedFloat(d), id)| (id, d)).collect();
        out.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        out
    }

    /// Returns up to `k` ids ordered by ascending distance to `query`,
    /// using the default (parallel-eligible) search configuration.
    pub fn search(&self, query: &[f64], k: usize) -> Vec<NodeId> {
        self.search_with_config(query, k, SearchConfig::default_search_config())
    }

    /// Like [`Index::search`] but with explicit parallelism control. Must
    /// return the same id set as the sequential path modulo ties.
    pub fn search_with_config(&self, query: &[f64], k: usize, config: SearchConfig) -> Vec<NodeId> {
        if k == 0 {
            return Vec::new();
        }
        record_lock_acquire(LockRank::Global);
        let state = self.state.read();
        if state.nodes.is_empty() {
            record_lock_release(LockRank::Global);
            return Vec::new();
        }
        let entry_id = state.entry_point.expect("non-empty index has entry point");
        let entry = Arc::clone(state.nodes.get(&entry_id).expect("entry point present"));

        let top = self.greedy_descend(&state.nodes, entry, query, state.max_level, 1);
        // Search uses `ef_construction` as the candidate-list width,
        // matching the behavior of the reference index this crate's
        // graph algorithms are modeled on.
        let mut candidates =
            self.search_layer(&state.nodes, &top, query, self.params.ef_construction, 0, config);
        candidates.retain(|(id, _)| !state.deleted_ids.contains(id));
        candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(k);
        record_lock_release(LockRank::Global);
        candidates.into_iter().map(|(id, _)| id).collect()
    }
}
