//! Vectorized distance kernels with a cached capability probe.
//!
//! The capability check (`is_x86_feature_detected!`) runs once and is
//! cached in a [`OnceLock`]; the hot path pays a single atomic load
//! plus a branch, not a re-probe per call.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SimdLevel {
    #[cfg(target_arch = "x86_64")]
    Avx2,
    #[cfg(target_arch = "aarch64")]
    Neon,
    Scalar,
}

static SIMD_LEVEL: OnceLock<SimdLevel> = OnceLock::new();

pub(crate) fn simd_level() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(detect_simd_level)
}

fn detect_simd_level() -> SimdLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return SimdLevel::Avx2;
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        // NEON is part of the aarch64 baseline; no runtime probe needed.
        return SimdLevel::Neon;
    }
    #[allow(unreachable_code)]
    SimdLevel::Scalar
}

pub(super) fn euclidean_vectorized(a: &[f64], b: &[f64]) -> f64 {
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 => unsafe { x86_avx2::euclidean(a, b) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => unsafe { aarch64_neon::euclidean(a, b) },
        SimdLevel::Scalar => super::scalar::euclidean_scalar(a, b),
    }
}

pub(super) fn cosine_vectorized(a: &[f64], b: &[f64]) -> f64 {
    match simd_level() {
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2 => unsafe { x86_avx2::cosine(a, b) },
        #[cfg(target_arch = "aarch64")]
        SimdLevel::Neon => unsafe { aarch64_neon::cosine(a, b) },
        SimdLevel::Scalar => super::scalar::cosine_scalar(a, b),
    }
}

pub(super) fn euclidean_vectorized_batch(query: &[f64], flat: &[f64], dim: usize) -> Vec<f64> {
    let count = flat.len() / dim;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let candidate = &flat[i * dim..(i + 1) * dim];
        out.push(euclidean_vectorized(query, candidate));
    }
    out
}

#[cfg(target_arch = "x86_64")]
mod x86_avx2 {
    use std::arch::x86_64::*;

    /// # Safety
    /// Caller must have confirmed `avx2` and `fma` via
    /// `is_x86_feature_detected!` before calling. `a` and `b` must have
    /// equal length; all loads are unaligned (`_mm256_loadu_pd`) so no
    /// alignment precondition is required.
    #[target_feature(enable = "avx2,fma")]
    pub(super) unsafe fn euclidean(a: &[f64], b: &[f64]) -> f64 {
        let len = a.len();
        let chunks = len / 4;
        let mut acc = _mm256_setzero_pd();
        for i in 0..chunks {
            let base = i * 4;
            let va = _mm256_loadu_pd(a.as_ptr().add(base));
            let vb = _mm256_loadu_pd(b.as_ptr().add(base));
            let diff = _mm256_sub_pd(va, vb);
            acc = _mm256_fmadd_pd(diff, diff, acc);
        }
        let mut buf = [0.0_f64; 4];
        _mm256_storeu_pd(buf.as_mut_ptr(), acc);
        let mut sum = buf[0] + buf[1] + buf[2] + buf[3];
        for i in (chunks * 4)..len {
            let d = a[i] - b[i];
            sum += d * d;
        }
        sum.sqrt()
    }

    /// # Safety
    /// Same preconditions as [`euclidean`].
    #[target_feature(enable = "avx2,fma")]
    pub(super) unsafe fn cosine(a: &[f64], b: &[f64]) -> f64 {
        let len = a.len();
        let chunks = len / 4;
        let mut dot_acc = _mm256_setzero_pd();
        let mut na_acc = _mm256_setzero_pd();
        let mut nb_acc = _mm256_setzero_pd();
        for i in 0..chunks {
            let base = i * 4;
            let va = _mm256_loadu_pd(a.as_ptr().add(base));
            let vb = _mm256_loadu_pd(b.as_ptr().add(base));
            dot_acc = _mm256_fmadd_pd(va, vb, dot_acc);
            na_acc = _mm256_fmadd_pd(va, va, na_acc);
            nb_acc = _mm256_fmadd_pd(vb, vb, nb_acc);
        }
        let mut dot_buf = [0.0_f64; 4];
        let mut na_buf = [0.0_f64; 4];
        let mut nb_buf = [0.0_f64; 4];
        _mm256_storeu_pd(dot_buf.as_mut_ptr(), dot_acc);
        _mm256_storeu_pd(na_buf.as_mut_ptr(), na_acc);
        _mm256_storeu_pd(nb_buf.as_mut_ptr(), nb_acc);

        let mut dot = dot_buf.iter().sum::<f64>();
        let mut norm_a = na_buf.iter().sum::<f64>();
        let mut norm_b = nb_buf.iter().sum::<f64>();
        for i in (chunks * 4)..len {
            dot += a[i] * b[i];
            norm_a += a[i] * a[i];
            norm_b += b[i] * b[i];
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom == 0.0 {
            return 1.0;
        }
        1.0 - dot / denom
    }
}

#[cfg(target_arch = "aarch64")]
mod aarch64_neon {
    use std::arch::aarch64::*;

    /// # Safety
    /// `a` and `b` must have equal length. NEON is baseline on aarch64,
    /// so no runtime feature probe is required before calling this.
    #[target_feature(enable = "neon")]
    pub(super) unsafe fn euclidean(a: &[f64], b: &[f64]) -> f64 {
        let len = a.len();
        let chunks = len / 2;
        let mut acc = vdupq_n_f64(0.0);
        for i in 0..chunks {
            let base = i * 2;
            let va = vld1q_f64(a.as_ptr().add(base));
            let vb = vld1q_f64(b.as_ptr().add(base));
            let diff = vsubq_f64(va, vb);
            acc = vfmaq_f64(acc, diff, diff);
        }
        let mut buf = [0.0_f64; 2];
        vst1q_f64(buf.as_mut_ptr(), acc);
        let mut sum = buf[0] + buf[1];
        for i in (chunks * 2)..len {
            let d = a[i] - b[i];
            sum += d * d;
        }
        sum.sqrt()
    }

    /// # Safety
    /// Same preconditions as [`euclidean`].
    #[target_feature(enable = "neon")]
    pub(super) unsafe fn cosine(a: &[f64], b: &[f64]) -> f64 {
        let len = a.len();
        let chunks = len / 2;
        let mut dot_acc = vdupq_n_f64(0.0);
        let mut na_acc = vdupq_n_f64(0.0);
        let mut nb_acc = vdupq_n_f64(0.0);
        for i in 0..chunks {
            let base = i * 2;
            let va = vld1q_f64(a.as_ptr().add(base));
            let vb = vld1q_f64(b.as_ptr().add(base));
            dot_acc = vfmaq_f64(dot_acc, va, vb);
            na_acc = vfmaq_f64(na_acc, va, va);
            nb_acc = vfmaq_f64(nb_acc, vb, vb);
        }
        let mut dot_buf = [0.0_f64; 2];
        let mut na_buf = [0.0_f64; 2];
        let mut nb_buf = [0.0_f64; 2];
        vst1q_f64(dot_buf.as_mut_ptr(), dot_acc);
        vst1q_f64(na_buf.as_mut_ptr(), na_acc);
        vst1q_f64(nb_buf.as_mut_ptr(), nb_acc);

        let mut dot = dot_buf[0] + dot_buf[1];
        let mut norm_a = na_buf[0] + na_buf[1];
        let mut norm_b = nb_buf[0] + nb_buf[1];
        for i in (chunks * 2)..len {
            dot += a[i] * b[i];
            norm_a += a[i] * a[i];
            norm_b += b[i] * b[i];
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom == 0.0 {
            return 1.0;
        }
        1.0 - dot / denom
    }
}
