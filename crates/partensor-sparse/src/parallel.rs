//! Parallel kernels behind the tensor store
//!
//! Every function here has a rayon implementation (through
//! `scirs2_core::parallel_ops`) when the `parallel` feature is enabled and a
//! sequential fallback otherwise. Both produce identical results.
//!
//! # Examples
//!
//! ```rust
//! use partensor_sparse::parallel::{histogram, max_plus_one};
//!
//! let inds = vec![3, 0, 3, 1];
//! assert_eq!(max_plus_one(&inds), 4);
//! assert_eq!(histogram(&inds, 4), vec![1, 1, 0, 2]);
//! ```

use std::cmp::Ordering;

#[cfg(feature = "parallel")]
use scirs2_core::parallel_ops::*;
#[cfg(feature = "parallel")]
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// One past the largest index, or 0 for an empty slice
///
/// This is the per-mode dimension inferred from observed indices.
#[cfg(feature = "parallel")]
pub fn max_plus_one(inds: &[usize]) -> usize {
    inds.par_iter().map(|&i| i + 1).max().unwrap_or(0)
}

/// Sequential fallback for max_plus_one when parallel feature is disabled
#[cfg(not(feature = "parallel"))]
pub fn max_plus_one(inds: &[usize]) -> usize {
    inds.iter().map(|&i| i + 1).max().unwrap_or(0)
}

/// Occurrence count of every value in `0..len`
///
/// Workers increment shared atomic buckets, so memory stays at one counter
/// per value however the input is split.
///
/// # Panics
///
/// Panics if any index is `>= len`.
#[cfg(feature = "parallel")]
pub fn histogram(inds: &[usize], len: usize) -> Vec<usize> {
    let buckets: Vec<AtomicUsize> = (0..len).map(|_| AtomicUsize::new(0)).collect();
    inds.par_iter().for_each(|&i| {
        buckets[i].fetch_add(1, AtomicOrdering::Relaxed);
    });
    buckets.into_iter().map(AtomicUsize::into_inner).collect()
}

/// Sequential fallback for histogram when parallel feature is disabled
#[cfg(not(feature = "parallel"))]
pub fn histogram(inds: &[usize], len: usize) -> Vec<usize> {
    let mut hist = vec![0usize; len];
    for &i in inds {
        hist[i] += 1;
    }
    hist
}

/// Permutation of `0..len` that sorts positions by `cmp`
#[cfg(feature = "parallel")]
pub fn sort_permutation<F>(len: usize, cmp: F) -> Vec<usize>
where
    F: Fn(usize, usize) -> Ordering + Sync,
{
    let mut perm: Vec<usize> = (0..len).collect();
    perm.par_sort_unstable_by(|&a, &b| cmp(a, b));
    perm
}

/// Sequential fallback for sort_permutation when parallel feature is disabled
#[cfg(not(feature = "parallel"))]
pub fn sort_permutation<F>(len: usize, cmp: F) -> Vec<usize>
where
    F: Fn(usize, usize) -> Ordering + Sync,
{
    let mut perm: Vec<usize> = (0..len).collect();
    perm.sort_unstable_by(|&a, &b| cmp(a, b));
    perm
}

/// `src` reordered so that element `k` of the result is `src[perm[k]]`
#[cfg(feature = "parallel")]
pub fn gather<T>(src: &[T], perm: &[usize]) -> Vec<T>
where
    T: Copy + Send + Sync,
{
    perm.par_iter().map(|&p| src[p]).collect()
}

/// Sequential fallback for gather when parallel feature is disabled
#[cfg(not(feature = "parallel"))]
pub fn gather<T>(src: &[T], perm: &[usize]) -> Vec<T>
where
    T: Copy + Send + Sync,
{
    perm.iter().map(|&p| src[p]).collect()
}
