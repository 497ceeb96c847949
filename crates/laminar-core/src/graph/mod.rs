//! The layered graph index: node/level model, lock hierarchy, and the
//! `Index` type that ties distance, graph algorithms, and persistence
//! together.

pub(crate) mod locking;
pub(crate) mod safety_counters;

mod batch;
mod delete;
mod insert;
mod neighbors;
mod search;

pub use batch::{BatchInsertStats, BatchResult};
pub use safety_counters::CounterSnapshot;

use crate::distance::Metric;
use crate::error::{Error, Result};
use crate::config::HnswParams;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering as CmpOrdering;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Caller-chosen external identifier for a vector.
pub type NodeId = u64;

/// Wraps an `f64` distance so it can sit in a [`std::collections::BinaryHeap`].
///
/// `f64` is not `Ord` because of `NaN`; distances produced by the kernels
/// in this crate are never `NaN` for well-formed input, so `partial_cmp`
/// falling back to `Equal` only matters for degenerate inputs and never
/// panics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OrderedFloat(pub f64);

impl Eq for OrderedFloat {}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.0.partial_cmp(&other.0).unwrap_or(CmpOrdering::Equal)
    }
}

/// One layer's outgoing adjacency, stored by id (never by pointer) so
/// the graph can be persisted and reloaded symbolically.
#[derive(Debug, Default, Clone)]
pub(crate) struct Level {
    pub connections: Vec<NodeId>,
}

/// A graph vertex. `vector` is immutable after construction and safe to
/// read without locking; `levels` is guarded by its own reader/writer
/// lock, acquired only after the index-global lock (see [`locking`]).
pub(crate) struct Node {
    pub id: NodeId,
    pub vector: Vec<f64>,
    pub levels: RwLock<Vec<Level>>,
}

impl Node {
    fn new(id: NodeId, vector: Vec<f64>, top_level: usize) -> Self {
        Self {
            id,
            vector,
            levels: RwLock::new(vec![Level::default(); top_level + 1]),
        }
    }
}

pub(crate) struct IndexState {
    pub(crate) nodes: FxHashMap<NodeId, Arc<Node>>,
    pub(crate) entry_point: Option<NodeId>,
    pub(crate) max_level: usize,
    pub(crate) deleted_ids: FxHashSet<NodeId>,
}

impl IndexState {
    fn empty() -> Self {
        Self {
            nodes: FxHashMap::default(),
            entry_point: None,
            max_level: 0,
            deleted_ids: FxHashSet::default(),
        }
    }
}

/// A concurrent HNSW approximate nearest-neighbor index over fixed-width
/// `f64` vectors, generic over the distance [`Metric`].
///
/// Vectors are immutable once inserted; concurrent `search` calls never
/// block on each other. `insert`/`delete` take the global write lock for
/// the duration of the call (see the crate-level lock hierarchy).
pub struct Index<M: Metric> {
    pub(crate) state: RwLock<IndexState>,
    pub(crate) dim: usize,
    pub(crate) params: HnswParams,
    rng_state: AtomicU64,
    _metric: PhantomData<M>,
}

impl<M: Metric> Index<M> {
    /// Creates an empty index. `dim` is fixed for the lifetime of the
    /// index; every inserted vector must match it.
    pub fn new(dim: usize, params: HnswParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            state: RwLock::new(IndexState::empty()),
            dim,
            params,
            rng_state: AtomicU64::new(0x9E37_79B9_7F4A_7C15),
            _metric: PhantomData,
        })
    }

    /// Creates an empty index using dimension-scaled default parameters.
    pub fn with_defaults(dim: usize) -> Result<Self> {
        Self::new(dim, HnswParams::auto(dim))
    }

    /// The fixed dimension every vector in this index must match.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of live (non-deleted) nodes currently in the index.
    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Whether the index currently holds no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short identifier of the distance metric this index was built with.
    pub fn metric_name(&self) -> &'static str {
        M::name()
    }

    /// Snapshot of the always-on lock-order and corruption counters.
    pub fn diagnostics(&self) -> CounterSnapshot {
        safety_counters::COUNTERS.snapshot()
    }

    pub(crate) fn check_dim(&self, vector: &[f64]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                actual: vector.len(),
                expected: self.dim,
            });
        }
        Ok(())
    }

    /// `L = 0; while rand() < 0.5 and L < 32: L += 1`.
    ///
    /// Deliberately the half-rate geometric rule rather than the
    /// classical `-ln(U) / ln(M)` draw, to match the behavior of the
    /// reference index this crate's graph algorithms are modeled on.
    pub(crate) fn random_level(&self) -> usize {
        let mut level = 0usize;
        while self.next_uniform() < 0.5 && level < 32 {
            level += 1;
        }
        level
    }

    fn next_uniform(&self) -> f64 {
        // xorshift64*, reseeded if it ever lands on zero (an absorbing
        // state for xorshift).
        let next = self
            .rng_state
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                let seed = if s == 0 { 0x853c_49e6_748f_ea9b } else { s };
                let mut x = seed;
                x ^= x << 13;
                x ^= x >> 7;
                x ^= x << 17;
                Some(x)
            })
            .unwrap_or(0x853c_49e6_748f_ea9b);
        (next >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    pub(crate) fn compute_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        M::distance(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Euclidean;

    #[test]
    fn new_index_is_empty() {
        let ix: Index<Euclidean> = Index::with_defaults(4).unwrap();
        assert!(ix.is_empty());
        assert_eq!(ix.dim(), 4);
    }

    #[test]
    fn rejects_invalid_params() {
        let result: Result<Index<Euclidean>> =
            Index::new(4, HnswParams::custom(0, 16, 50));
        assert!(result.is_err());
    }

    #[test]
    fn random_level_is_bounded() {
        let ix: Index<Euclidean> = Index::with_defaults(4).unwrap();
        for _ in 0..10_000 {
            let l = ix.random_level();
            assert!(l <= 32);
        }
    }

    #[test]
    fn random_level_distribution_is_skewed_low() {
        let ix: Index<Euclidean> = Index::with_defaults(4).unwrap();
        let samples: Vec<usize> = (0..5000).map(|_| ix.random_level()).collect();
        let zeros = samples.iter().filter(|&&l| l == 0).count();
        // With p=0.5 per step, roughly half of draws should stop at 0.
        assert!(zeros > 1800 && zeros < 3200, "zeros={zeros}");
    }
}
