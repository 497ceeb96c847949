//! Distance kernels: pairwise and batched Euclidean and cosine distance
//! over `f64` vectors, with a vectorized fast path and a scalar fallback.
//!
//! The metric is carried as a zero-sized type parameter on [`crate::graph::Index`]
//! rather than a runtime-dispatched enum, so the compiler can inline the
//! comparison used on every edge of the graph.

mod scalar;
mod simd;

/// A distance metric over fixed-dimension `f64` vectors.
///
/// Implementors are zero-sized marker types; the metric identity is
/// encoded at the type level so `Index<M>` monomorphizes on it.
pub trait Metric: Send + Sync + 'static {
    /// Distance between two equal-length vectors. Smaller is closer.
    fn distance(a: &[f64], b: &[f64]) -> f64;

    /// Distance from `query` to every vector in `candidates`, in order.
    ///
    /// The default loops `distance` once per candidate; implementors may
    /// override this to flatten `candidates` into one contiguous buffer
    /// before dispatching to a vectorized kernel.
    fn batch_distance(query: &[f64], candidates: &[&[f64]]) -> Vec<f64> {
        candidates.iter().map(|c| Self::distance(query, c)).collect()
    }

    /// Short identifier used in persisted snapshots and diagnostics.
    fn name() -> &'static str;
}

/// Euclidean (L2) distance: `sqrt(sum((a_i - b_i)^2))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl Metric for Euclidean {
    fn distance(a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        if simd::simd_level() != simd::SimdLevel::Scalar && a.len() >= 8 {
            simd::euclidean_vectorized(a, b)
        } else {
            scalar::euclidean_scalar(a, b)
        }
    }

    fn batch_distance(query: &[f64], candidates: &[&[f64]]) -> Vec<f64> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let dim = query.len();
        if simd::simd_level() != simd::SimdLevel::Scalar && dim >= 4 {
            // Copy candidates into one contiguous buffer so the kernel
            // walks a single cache-friendly allocation instead of
            // chasing `candidates`' pointers one at a time.
            let mut flat = Vec::with_capacity(dim * candidates.len());
            for c in candidates {
                flat.extend_from_slice(c);
            }
            simd::euclidean_vectorized_batch(query, &flat, dim)
        } else {
            candidates
                .iter()
                .map(|c| scalar::euclidean_scalar(query, c))
                .collect()
        }
    }

    fn name() -> &'static str {
        "euclidean"
    }
}

/// Cosine distance: `1 - dot(a, b) / (norm(a) * norm(b))`.
///
/// When either vector has zero norm the denominator is zero; this
/// implementation returns `1.0` (maximal distance) in that case rather
/// than producing `NaN`, matching the convention used elsewhere in this
/// lineage's distance kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl Metric for Cosine {
    fn distance(a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        if simd::simd_level() != simd::SimdLevel::Scalar && a.len() >= 8 {
            simd::cosine_vectorized(a, b)
        } else {
            scalar::cosine_scalar(a, b)
        }
    }

    fn batch_distance(query: &[f64], candidates: &[&[f64]]) -> Vec<f64> {
        candidates.iter().map(|c| Self::distance(query, c)).collect()
    }

    fn name() -> &'static str {
        "cosine"
    }
}
