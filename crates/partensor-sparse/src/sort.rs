//! Mode-major sorting of sparse tensors
//!
//! Sorting by mode `m` orders entries lexicographically by
//! `(ind[m], ind[m+1], …, ind[nmodes-1], ind[0], …, ind[m-1])`. Deduplication,
//! union and unfolding all require this order.
//!
//! # Examples
//!
//! ```
//! use partensor_sparse::SpTensor;
//!
//! let mut tt = SpTensor::from_arrays(
//!     vec![vec![1, 0, 1], vec![0, 2, 1]],
//!     vec![1.0, 2.0, 3.0],
//! ).unwrap();
//!
//! tt.sort_by_mode(1).unwrap();
//! assert_eq!(tt.ind(1), &[0, 1, 2]);
//! assert_eq!(tt.vals(), &[1.0, 3.0, 2.0]);
//! ```

use crate::error::{SparseError, SparseResult};
use crate::parallel;
use crate::sptensor::SpTensor;
use partensor_core::Scalar;
use std::cmp::Ordering;

/// Key order used when sorting by `primary`: `primary` first, then the
/// remaining modes in cyclic order
pub fn mode_order(nmodes: usize, primary: usize) -> Vec<usize> {
    (0..nmodes).map(|k| (primary + k) % nmodes).collect()
}

/// Compare entries `a` and `b` of `ind` along the modes in `order`
pub(crate) fn cmp_entries(ind: &[Vec<usize>], order: &[usize], a: usize, b: usize) -> Ordering {
    for &m in order {
        match ind[m][a].cmp(&ind[m][b]) {
            Ordering::Equal => continue,
            unequal => return unequal,
        }
    }
    Ordering::Equal
}

/// Compare entry `a` of `lhs` with entry `b` of `rhs` in mode order 0, 1, …
pub(crate) fn cmp_entries_across(
    lhs: &[Vec<usize>],
    a: usize,
    rhs: &[Vec<usize>],
    b: usize,
) -> Ordering {
    lhs.iter()
        .zip(rhs)
        .map(|(l, r)| l[a].cmp(&r[b]))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

impl<T: Scalar> SpTensor<T> {
    /// Sort entries by `mode`, then by the following modes cyclically
    ///
    /// Entries with identical coordinates end up adjacent in unspecified
    /// relative order; the only operation ever applied to them is summation.
    ///
    /// # Complexity
    ///
    /// O(nnz × log(nnz) × nmodes)
    pub fn sort_by_mode(&mut self, mode: usize) -> SparseResult<()> {
        SparseError::check_mode(mode, self.nmodes())?;
        self.sort_unchecked(mode);
        Ok(())
    }

    /// Whether entries are in the order [`SpTensor::sort_by_mode`] produces
    pub fn is_sorted_by_mode(&self, mode: usize) -> bool {
        if mode >= self.nmodes() {
            return false;
        }
        let order = mode_order(self.nmodes(), mode);
        (1..self.nnz()).all(|n| cmp_entries(&self.ind, &order, n - 1, n) != Ordering::Greater)
    }

    pub(crate) fn sort_unchecked(&mut self, mode: usize) {
        if self.is_sorted_by_mode(mode) {
            return;
        }

        let order = mode_order(self.nmodes(), mode);
        let ind = &self.ind;
        let perm = parallel::sort_permutation(self.nnz(), |a, b| cmp_entries(ind, &order, a, b));

        for inds in self.ind.iter_mut() {
            *inds = parallel::gather(inds, &perm);
        }
        self.vals = parallel::gather(&self.vals, &perm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_order() {
        assert_eq!(mode_order(3, 0), vec![0, 1, 2]);
        assert_eq!(mode_order(3, 2), vec![2, 0, 1]);
        assert_eq!(mode_order(1, 0), vec![0]);
    }

    #[test]
    fn test_sort_by_mode_zero() {
        let mut tt = SpTensor::from_arrays(
            vec![vec![2, 0, 1, 0], vec![0, 1, 0, 0], vec![0, 0, 0, 5]],
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();

        tt.sort_by_mode(0).unwrap();
        assert_eq!(tt.coord(0), vec![0, 0, 5]);
        assert_eq!(tt.coord(1), vec![0, 1, 0]);
        assert_eq!(tt.coord(2), vec![1, 0, 0]);
        assert_eq!(tt.coord(3), vec![2, 0, 0]);
        assert_eq!(tt.vals(), &[4.0, 2.0, 3.0, 1.0]);
        assert!(tt.is_sorted_by_mode(0));
    }

    #[test]
    fn test_sort_uses_cyclic_tiebreak() {
        // ties on mode 1 are broken by mode 2, then mode 0
        let mut tt = SpTensor::from_arrays(
            vec![vec![0, 1, 0], vec![3, 3, 3], vec![1, 0, 0]],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();

        tt.sort_by_mode(1).unwrap();
        assert_eq!(tt.vals(), &[3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_sort_invalid_mode() {
        let mut tt = SpTensor::from_arrays(vec![vec![0]], vec![1.0]).unwrap();
        assert!(tt.sort_by_mode(1).is_err());
        assert!(!tt.is_sorted_by_mode(1));
    }
}
