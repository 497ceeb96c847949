//! Construction and search-time tuning parameters.

use crate::error::{Error, Result};

/// Graph construction parameters: degree caps and candidate-list width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HnswParams {
    pub(crate) m: usize,
    pub(crate) m_max: usize,
    pub(crate) ef_construction: usize,
}

impl HnswParams {
    /// Dimension-scaled defaults: wider graphs for higher-dimensional
    /// embeddings, where more candidate edges are needed to keep recall
    /// stable.
    #[must_use]
    pub fn auto(dim: usize) -> Self {
        if dim <= 128 {
            Self::custom(12, 24, 100)
        } else if dim <= 512 {
            Self::custom(16, 32, 150)
        } else {
            Self::custom(24, 48, 200)
        }
    }

    /// Smaller graph, faster to build and search, lower recall.
    #[must_use]
    pub fn fast() -> Self {
        Self::custom(8, 16, 50)
    }

    /// Higher recall at the cost of build and search time.
    #[must_use]
    pub fn high_recall(dim: usize) -> Self {
        let base = Self::auto(dim);
        Self::custom(base.m * 2, base.m_max * 2, base.ef_construction * 2)
    }

    /// Maximum recall; substantially slower to build.
    #[must_use]
    pub fn max_recall(dim: usize) -> Self {
        let base = Self::auto(dim);
        Self::custom(base.m * 3, base.m_max * 3, base.ef_construction * 4)
    }

    /// Fully manual construction. `m` and `m_max` must be non-zero.
    #[must_use]
    pub fn custom(m: usize, m_max: usize, ef_construction: usize) -> Self {
        Self {
            m,
            m_max,
            ef_construction,
        }
    }

    pub(crate) fn validate(self) -> Result<()> {
        if self.m == 0 || self.m_max == 0 {
            return Err(Error::InvalidArgument(
                "m and m_max must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::auto(768)
    }
}

/// Search-time options, distinct from construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Whether distance evaluation within a layer scan may be
    /// parallelized across candidates.
    pub use_parallel: bool,
    /// Worker count for parallel evaluation. `0` means "use the
    /// hardware parallelism default".
    pub worker_count: usize,
}

impl SearchConfig {
    /// `{ use_parallel: true, worker_count: 0 }`.
    #[must_use]
    pub fn default_search_config() -> Self {
        Self {
            use_parallel: true,
            worker_count: 0,
        }
    }

    /// Sequential search, identical result ordering to the parallel path.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            use_parallel: false,
            worker_count: 0,
        }
    }

    pub(crate) fn resolved_workers(self) -> usize {
        if self.worker_count == 0 {
            num_cpus::get()
        } else {
            self.worker_count
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::default_search_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_scales_with_dimension() {
        let small = HnswParams::auto(64);
        let large = HnswParams::auto(1024);
        assert!(large.m > small.m);
        assert!(large.ef_construction > small.ef_construction);
    }

    #[test]
    fn rejects_zero_m() {
        assert!(HnswParams::custom(0, 16, 50).validate().is_err());
    }

    #[test]
    fn default_search_config_matches_spec() {
        let cfg = SearchConfig::default_search_config();
        assert!(cfg.use_parallel);
        assert_eq!(cfg.worker_count, 0);
    }
}
