//! Matricization of a sparse tensor along one mode
//!
//! Unfolding along mode `k` maps entry `(i₀, …, iₙ₋₁)` to row `iₖ` and to a
//! column that flattens the remaining indices in mixed radix. The last mode
//! is least significant:
//!
//! ```text
//! col = Σ_{m ≠ k} i_m · Π_{m < j < n, j ≠ k} dims[j]
//! ```
//!
//! [`ColumnLayout`] holds that bijection on its own so it can be used and
//! tested without building a matrix.
//!
//! # Examples
//!
//! ```
//! use partensor_sparse::SpTensor;
//!
//! let mut tt = SpTensor::from_arrays(
//!     vec![vec![1, 0], vec![0, 2], vec![1, 1]],
//!     vec![3.0, 4.0],
//! ).unwrap();
//!
//! // 2 x 3 x 2 tensor unfolded along mode 0: 2 rows, 6 columns
//! let m = tt.unfold(0).unwrap();
//! assert_eq!(m.shape(), (2, 6));
//! assert_eq!(m.row_ptr(), &[0, 1, 2]);
//! assert_eq!(m.col_indices(), &[5, 1]);
//! ```

use crate::csr::CsrMatrix;
use crate::error::{SparseError, SparseResult};
use crate::sptensor::SpTensor;
use partensor_core::Scalar;

/// Bijection between the indices of every mode but one and a column id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    mode: usize,
    dims: Vec<usize>,
    /// Place value of each mode; 0 for the row mode
    strides: Vec<usize>,
    ncols: usize,
}

impl ColumnLayout {
    /// Layout for unfolding a tensor of shape `dims` along `mode`
    ///
    /// # Errors
    ///
    /// Returns error if `mode` is out of range or the column count
    /// overflows `usize`.
    pub fn new(dims: &[usize], mode: usize) -> SparseResult<Self> {
        SparseError::check_mode(mode, dims.len())?;

        let mut strides = vec![0; dims.len()];
        let mut mult: usize = 1;
        for m in (0..dims.len()).rev().filter(|&m| m != mode) {
            strides[m] = mult;
            mult = mult
                .checked_mul(dims[m])
                .ok_or(SparseError::ColumnOverflow { mode })?;
        }

        Ok(Self {
            mode,
            dims: dims.to_vec(),
            strides,
            ncols: mult,
        })
    }

    /// Mode that becomes the rows
    pub fn mode(&self) -> usize {
        self.mode
    }

    /// Product of every dimension except the row mode
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Column of a full coordinate; the row-mode component is ignored
    pub fn column_of(&self, coord: &[usize]) -> usize {
        self.column_with(|m| coord[m])
    }

    /// Column of the coordinate whose mode-`m` index is `index(m)`
    pub fn column_with(&self, index: impl Fn(usize) -> usize) -> usize {
        self.strides
            .iter()
            .enumerate()
            .filter(|&(m, _)| m != self.mode)
            .map(|(m, &stride)| index(m) * stride)
            .sum()
    }

    /// Full coordinate of `(row, col)`, or `None` if `col` is out of range
    pub fn coords_of(&self, row: usize, col: usize) -> Option<Vec<usize>> {
        if col >= self.ncols {
            return None;
        }

        let mut coord = vec![0; self.dims.len()];
        let mut rest = col;
        for m in (0..self.dims.len()).rev().filter(|&m| m != self.mode) {
            coord[m] = rest % self.dims[m];
            rest /= self.dims[m];
        }
        coord[self.mode] = row;
        Some(coord)
    }
}

impl<T: Scalar> SpTensor<T> {
    /// Unfold along `mode` into a `dims[mode] × Π_{m≠mode} dims[m]` CSR matrix
    ///
    /// Sorts the tensor by `mode` first. Rows without entries get an empty
    /// range in `row_ptr`. Duplicate coordinates become repeated columns
    /// within a row.
    ///
    /// # Errors
    ///
    /// Returns error if `mode` is out of range, the column count overflows,
    /// or an index exceeds its dimension.
    pub fn unfold(&mut self, mode: usize) -> SparseResult<CsrMatrix<T>> {
        let layout = ColumnLayout::new(&self.dims, mode)?;
        self.sort_unchecked(mode);

        let nnz = self.nnz();
        let nrows = self.dims[mode];

        let mut row_ptr = Vec::with_capacity(nrows + 1);
        for (n, &row) in self.ind[mode].iter().enumerate() {
            while row_ptr.len() <= row {
                row_ptr.push(n);
            }
        }
        row_ptr.resize(nrows + 1, nnz);

        let ind = &self.ind;
        let col_indices = (0..nnz)
            .map(|n| layout.column_with(|m| ind[m][n]))
            .collect();

        tracing::trace!(mode, nrows, ncols = layout.ncols(), nnz, "unfolded tensor");
        Ok(CsrMatrix::new(
            row_ptr,
            col_indices,
            self.vals.clone(),
            (nrows, layout.ncols()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_strides() {
        let layout = ColumnLayout::new(&[2, 3, 4], 1).unwrap();
        assert_eq!(layout.ncols(), 8);
        assert_eq!(layout.column_of(&[1, 99, 3]), 7);
        assert_eq!(layout.column_of(&[1, 0, 0]), 4);
    }

    #[test]
    fn test_layout_is_bijection() {
        let dims = [3, 2, 4, 2];
        for mode in 0..dims.len() {
            let layout = ColumnLayout::new(&dims, mode).unwrap();
            let mut seen = vec![false; layout.ncols()];
            for col in 0..layout.ncols() {
                let coord = layout.coords_of(5, col).unwrap();
                assert_eq!(coord[mode], 5);
                assert_eq!(layout.column_of(&coord), col);
                assert!(!seen[col]);
                seen[col] = true;
            }
            assert!(layout.coords_of(0, layout.ncols()).is_none());
        }
    }

    #[test]
    fn test_layout_errors() {
        assert!(matches!(
            ColumnLayout::new(&[2, 2], 2),
            Err(SparseError::InvalidMode { .. })
        ));
        assert_eq!(
            ColumnLayout::new(&[usize::MAX, 3, 1], 2),
            Err(SparseError::ColumnOverflow { mode: 2 })
        );
    }

    #[test]
    fn test_unfold_empty_rows() {
        let mut tt = SpTensor::from_arrays(vec![vec![3, 0, 3], vec![1, 0, 0]], vec![1.0, 2.0, 3.0])
            .unwrap();

        let m = tt.unfold(0).unwrap();
        assert_eq!(m.shape(), (4, 2));
        assert_eq!(m.row_ptr(), &[0, 1, 1, 1, 3]);
        assert_eq!(m.col_indices(), &[0, 0, 1]);
        assert_eq!(m.values(), &[2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_unfold_matches_dense() {
        let mut tt = SpTensor::from_arrays(
            vec![vec![0, 1, 1, 0], vec![2, 0, 1, 1], vec![1, 1, 0, 0]],
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();

        for mode in 0..3 {
            let dense = tt.unfold(mode).unwrap().to_dense();
            let layout = ColumnLayout::new(tt.dims(), mode).unwrap();
            for n in 0..tt.nnz() {
                let coord = tt.coord(n);
                assert_eq!(dense[[coord[mode], layout.column_of(&coord)]], tt.vals()[n]);
            }
            let total: f64 = dense.iter().sum();
            assert_eq!(total, 10.0);
        }
    }

    #[test]
    fn test_unfold_single_mode() {
        let mut tt = SpTensor::from_arrays(vec![vec![2, 0]], vec![1.0, 2.0]).unwrap();
        let m = tt.unfold(0).unwrap();
        assert_eq!(m.shape(), (3, 1));
        assert_eq!(m.row_ptr(), &[0, 1, 1, 2]);
    }
}
