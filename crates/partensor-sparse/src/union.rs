//! Union of two sparse tensors by sorted merge
//!
//! Both operands are sorted by mode 0 and merged in a single pass:
//!
//! | A entry vs. B entry                 | emitted                     |
//! |-------------------------------------|-----------------------------|
//! | same coordinate, same value         | one entry                   |
//! | same coordinate, different value    | both entries, A's first     |
//! | coordinate only in one operand      | that entry                  |
//!
//! The output carries no `indmap` and its dimensions are inferred from the
//! merged indices.

use crate::error::{SparseError, SparseResult};
use crate::sort::cmp_entries_across;
use crate::sptensor::SpTensor;
use partensor_core::Scalar;
use std::cmp::Ordering;

impl<T: Scalar> SpTensor<T> {
    /// Merge `a` and `b` into a new tensor
    ///
    /// Both operands are sorted by mode 0 in place as a side effect.
    ///
    /// # Errors
    ///
    /// Returns error if the operands have different mode counts.
    ///
    /// # Examples
    ///
    /// ```
    /// use partensor_sparse::SpTensor;
    ///
    /// let mut a = SpTensor::from_arrays(vec![vec![0, 2], vec![1, 1]], vec![1.0, 2.0]).unwrap();
    /// let mut b = SpTensor::from_arrays(vec![vec![1, 2], vec![0, 1]], vec![5.0, 2.0]).unwrap();
    ///
    /// let u = SpTensor::union(&mut a, &mut b).unwrap();
    /// assert_eq!(u.nnz(), 3);
    /// assert_eq!(u.vals(), &[1.0, 5.0, 2.0]);
    /// ```
    pub fn union(a: &mut SpTensor<T>, b: &mut SpTensor<T>) -> SparseResult<SpTensor<T>> {
        if a.nmodes() != b.nmodes() {
            return Err(SparseError::ModeCountMismatch {
                expected: a.nmodes(),
                got: b.nmodes(),
            });
        }
        let nmodes = a.nmodes();

        a.sort_unchecked(0);
        b.sort_unchecked(0);
        let (a, b): (&SpTensor<T>, &SpTensor<T>) = (a, b);

        let capacity = a.nnz() + b.nnz();
        let mut ind: Vec<Vec<usize>> = (0..nmodes).map(|_| Vec::with_capacity(capacity)).collect();
        let mut vals = Vec::with_capacity(capacity);
        let mut emit = |src: &SpTensor<T>, n: usize| {
            for (out, inds) in ind.iter_mut().zip(&src.ind) {
                out.push(inds[n]);
            }
            vals.push(src.vals[n]);
        };

        let (mut pa, mut pb) = (0, 0);
        let mut exact_matches = 0;
        while pa < a.nnz() && pb < b.nnz() {
            match cmp_entries_across(&a.ind, pa, &b.ind, pb) {
                Ordering::Less => {
                    emit(a, pa);
                    pa += 1;
                }
                Ordering::Greater => {
                    emit(b, pb);
                    pb += 1;
                }
                Ordering::Equal => {
                    emit(a, pa);
                    if a.vals[pa] == b.vals[pb] {
                        exact_matches += 1;
                    } else {
                        emit(b, pb);
                    }
                    pa += 1;
                    pb += 1;
                }
            }
        }
        for n in pa..a.nnz() {
            emit(a, n);
        }
        for n in pb..b.nnz() {
            emit(b, n);
        }

        tracing::debug!(
            nnz_a = a.nnz(),
            nnz_b = b.nnz(),
            exact_matches,
            nnz = vals.len(),
            "merged tensors"
        );

        SpTensor::from_arrays(ind, vals)
    }
}
