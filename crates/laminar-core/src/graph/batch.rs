//! Bulk concurrency façade: `batch_insert` spins up a bounded task queue
//! and worker pool (mirroring the channel-and-worker-pool shape of the
//! reference index's batch inserter); `batch_search`/`batch_delete`
//! partition work across a `rayon` pool since each unit of work only
//! needs the global read lock (search) or is independently
//! write-locking (delete).

use super::{Index, NodeId};
use crate::config::SearchConfig;
use crate::distance::Metric;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of a [`Index::batch_insert`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchInsertStats {
    /// Number of vectors successfully inserted.
    pub inserted: u64,
    /// Number rejected (duplicate id or dimension mismatch).
    pub failed: u64,
}

/// Per-query outcome of a [`Index::batch_search`] call, preserving
/// input order.
pub type BatchResult = Vec<Vec<NodeId>>;

impl<M: Metric> Index<M> {
    /// Inserts every `(id, vector)` pair via a bounded worker pool.
    /// Insertions still serialize through the global write lock one at
    /// a time; the pool amortizes scheduling overhead and keeps this
    /// API symmetric with `batch_search`/`batch_delete`.
    pub fn batch_insert(&self, items: Vec<(u64, Vec<f64>)>) -> BatchInsertStats {
        if items.is_empty() {
            return BatchInsertStats::default();
        }
        let worker_count = num_cpus::get().min(items.len()).max(1);
        let (sender, receiver) = crossbeam_channel::bounded::<(u64, Vec<f64>)>(items.len().min(256));
        let inserted = AtomicU64::new(0);
        let failed = AtomicU64::new(0);

        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                let receiver = receiver.clone();
                let inserted = &inserted;
                let failed = &failed;
                scope.spawn(move || {
                    while let Ok((id, vector)) = receiver.recv() {
                        match self.insert(id, vector) {
                            Ok(()) => {
                                inserted.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(_) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
            for item in items {
                sender.send(item).expect("workers outlive the sender");
            }
            drop(sender);
        });

        BatchInsertStats {
            inserted: inserted.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        }
    }

    /// Runs `search_with_config` for every query in parallel, returning
    /// results in input order.
    pub fn batch_search(&self, queries: &[Vec<f64>], k: usize, config: SearchConfig) -> BatchResult {
        queries
            .par_iter()
            .map(|q| self.search_with_config(q, k, config))
            .collect()
    }

    /// Deletes every id in `ids`, partitioned across a `rayon` pool.
    pub fn batch_delete(&self, ids: &[u64]) {
        ids.par_iter().for_each(|&id| self.delete(id));
    }
}

#[cfg(test)]
mod tests {
    use super::super::Index;
    use crate::config::SearchConfig;
    use crate::distance::Euclidean;

    #[test]
    fn batch_insert_search_delete_round_trip() {
        let ix: Index<Euclidean> = Index::with_defaults(2).unwrap();
        let items: Vec<(u64, Vec<f64>)> = (0..100u64)
            .map(|i| (i, vec![(i / 10) as f64, (i % 10) as f64]))
            .collect();
        let stats = ix.batch_insert(items);
        assert_eq!(stats.inserted, 100);
        assert_eq!(stats.failed, 0);
        assert_eq!(ix.len(), 100);

        let queries: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, i as f64]).collect();
        let results = ix.batch_search(&queries, 5, SearchConfig::default_search_config());
        assert_eq!(results.len(), queries.len());
        for r in &results {
            assert!(r.len() <= 5);
        }

        let ids: Vec<u64> = (0..10).collect();
        ix.batch_delete(&ids);
        let state = ix.state.read();
        for id in &ids {
            assert!(!state.nodes.contains_key(id));
        }
    }

    #[test]
    fn batch_insert_reports_duplicate_failures() {
        let ix: Index<Euclidean> = Index::with_defaults(2).unwrap();
        ix.insert(1, vec![1.0, 1.0]).unwrap();
        let stats = ix.batch_insert(vec![(1, vec![2.0, 2.0]), (2, vec![3.0, 3.0])]);
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.failed, 1);
    }
}
