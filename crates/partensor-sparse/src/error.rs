//! Error types for the sparse tensor store
//!
//! Malformed input is rejected when a tensor is built or combined; once a
//! tensor exists, the canonicalisation routines keep its invariants and do
//! not fail.
//!
//! # Examples
//!
//! ```
//! use partensor_sparse::{SpTensor, SparseError};
//!
//! let err = SpTensor::<f64>::from_arrays(vec![vec![0, 1], vec![0]], vec![1.0, 2.0])
//!     .unwrap_err();
//! assert!(matches!(err, SparseError::LengthMismatch { mode: 1, .. }));
//! ```

use crate::csr::CsrError;
use thiserror::Error;

/// Top-level error type for sparse tensor operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SparseError {
    #[error("Tensor must have at least one mode")]
    NoModes,

    #[error("Mode {mode} out of range for a {nmodes}-mode tensor")]
    InvalidMode { mode: usize, nmodes: usize },

    #[error("Length mismatch: mode {mode} has {got} indices but there are {expected} values")]
    LengthMismatch {
        mode: usize,
        expected: usize,
        got: usize,
    },

    #[error("Mode count mismatch: expected {expected}, got {got}")]
    ModeCountMismatch { expected: usize, got: usize },

    #[error("Index {index} out of bounds for mode {mode} with dimension {dim}")]
    IndexOutOfBounds {
        mode: usize,
        index: usize,
        dim: usize,
    },

    #[error("Unfolding mode {mode} needs more than usize::MAX columns")]
    ColumnOverflow { mode: usize },

    #[error("CSR error: {0}")]
    Csr(#[from] CsrError),
}

/// Result type alias for sparse tensor operations
pub type SparseResult<T> = Result<T, SparseError>;

impl SparseError {
    /// Check `mode` against a tensor with `nmodes` modes
    pub fn check_mode(mode: usize, nmodes: usize) -> SparseResult<()> {
        if mode < nmodes {
            Ok(())
        } else {
            Err(SparseError::InvalidMode { mode, nmodes })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SparseError::InvalidMode { mode: 3, nmodes: 3 };
        assert_eq!(err.to_string(), "Mode 3 out of range for a 3-mode tensor");

        let err = SparseError::IndexOutOfBounds {
            mode: 1,
            index: 9,
            dim: 4,
        };
        assert_eq!(
            err.to_string(),
            "Index 9 out of bounds for mode 1 with dimension 4"
        );
    }

    #[test]
    fn test_check_mode() {
        assert!(SparseError::check_mode(0, 1).is_ok());
        assert_eq!(
            SparseError::check_mode(2, 2),
            Err(SparseError::InvalidMode { mode: 2, nmodes: 2 })
        );
    }
}
