//! CSR (Compressed Sparse Row) matrices produced by unfolding
//!
//! For an m×n sparse matrix with nnz non-zeros:
//! - `row_ptr`: length m+1, `row_ptr[i]` is the start of row i
//! - `col_indices`: length nnz, column index of each non-zero
//! - `values`: length nnz, the non-zero values
//!
//! Zero-sized shapes are allowed: unfolding a tensor whose other modes are
//! all empty yields an m×0 matrix.
//!
//! # Examples
//!
//! ```
//! use partensor_sparse::CsrMatrix;
//!
//! // [1.0  0   2.0  0  ]
//! // [0    3.0 0    0  ]
//! // [4.0  0   0    5.0]
//! let csr = CsrMatrix::new(
//!     vec![0, 2, 3, 5],
//!     vec![0, 2, 1, 0, 3],
//!     vec![1.0, 2.0, 3.0, 4.0, 5.0],
//!     (3, 4),
//! ).unwrap();
//! assert_eq!(csr.nnz(), 5);
//! assert_eq!(csr.row(2), Some((&[0, 3][..], &[4.0, 5.0][..])));
//! ```

use scirs2_core::ndarray_ext::Array2;
use scirs2_core::numeric::Float;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsrError {
    #[error("Invalid row pointers: got {len}, expected {expected} for {nrows} rows")]
    InvalidRowPtr {
        len: usize,
        nrows: usize,
        expected: usize,
    },

    #[error("Row pointer not sorted at index {idx}: {curr} > {next}")]
    RowPtrNotSorted {
        idx: usize,
        curr: usize,
        next: usize,
    },

    #[error("Length mismatch: {col_indices} col_indices but {values} values")]
    LengthMismatch { col_indices: usize, values: usize },

    #[error("Column index out of bounds: {col_idx} >= {ncols}")]
    ColIndexOutOfBounds { col_idx: usize, ncols: usize },
}

/// CSR (Compressed Sparse Row) matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T> {
    /// Row pointers, length nrows + 1 with `row_ptr[nrows] == nnz`
    row_ptr: Vec<usize>,

    col_indices: Vec<usize>,

    values: Vec<T>,

    /// (nrows, ncols)
    shape: (usize, usize),
}

impl<T> CsrMatrix<T> {
    /// Create a CSR matrix from its three arrays
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `row_ptr` does not have `nrows + 1` entries ending at nnz
    /// - `col_indices` and `values` have different lengths
    /// - `row_ptr` decreases anywhere
    /// - any column index is `>= ncols`
    pub fn new(
        row_ptr: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
        shape: (usize, usize),
    ) -> Result<Self, CsrError> {
        let (nrows, ncols) = shape;

        if row_ptr.len() != nrows + 1 {
            return Err(CsrError::InvalidRowPtr {
                len: row_ptr.len(),
                nrows,
                expected: nrows + 1,
            });
        }

        if col_indices.len() != values.len() {
            return Err(CsrError::LengthMismatch {
                col_indices: col_indices.len(),
                values: values.len(),
            });
        }

        for (idx, w) in row_ptr.windows(2).enumerate() {
            if w[0] > w[1] {
                return Err(CsrError::RowPtrNotSorted {
                    idx,
                    curr: w[0],
                    next: w[1],
                });
            }
        }

        let nnz = col_indices.len();
        if row_ptr[0] != 0 || row_ptr[nrows] != nnz {
            return Err(CsrError::InvalidRowPtr {
                len: row_ptr[nrows],
                nrows,
                expected: nnz,
            });
        }

        if let Some(&col_idx) = col_indices.iter().find(|&&c| c >= ncols) {
            return Err(CsrError::ColIndexOutOfBounds { col_idx, ncols });
        }

        Ok(Self {
            row_ptr,
            col_indices,
            values,
            shape,
        })
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// (nrows, ncols)
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn nrows(&self) -> usize {
        self.shape.0
    }

    pub fn ncols(&self) -> usize {
        self.shape.1
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Get a row as (col_indices, values) slices
    pub fn row(&self, i: usize) -> Option<(&[usize], &[T])> {
        if i >= self.nrows() {
            return None;
        }

        let start = self.row_ptr[i];
        let end = self.row_ptr[i + 1];

        Some((&self.col_indices[start..end], &self.values[start..end]))
    }
}

impl<T: Float> CsrMatrix<T> {
    /// Dense copy; repeated columns within a row are summed
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::zeros(self.shape);
        for row in 0..self.nrows() {
            for idx in self.row_ptr[row]..self.row_ptr[row + 1] {
                let cell = &mut dense[[row, self.col_indices[idx]]];
                *cell = *cell + self.values[idx];
            }
        }
        dense
    }
}
