//! Coordinate-format sparse tensor with per-mode index arrays
//!
//! A [`SpTensor`] stores `nnz` nonzeros of an `nmodes`-way tensor as one
//! index array per mode plus a value array, all of length `nnz`:
//!
//! - `ind[m][n]`: index of entry `n` along mode `m`
//! - `vals[n]`: value of entry `n`
//! - `dims[m]`: extent of mode `m`
//! - `indmap[m]`: local→global map left behind by [`SpTensor::remove_empty_slices`]
//!
//! Every index satisfies `ind[m][n] < dims[m]`. Canonicalisation (sorting,
//! duplicate removal, empty-slice compaction) lives in [`crate::sort`] and
//! [`crate::canonical`].
//!
//! # Examples
//!
//! ```
//! use partensor_sparse::SpTensor;
//!
//! let ind = vec![vec![0, 2, 1], vec![1, 0, 3], vec![0, 0, 2]];
//! let vals = vec![1.0, 2.0, 3.0];
//!
//! let tt = SpTensor::from_arrays(ind, vals).unwrap();
//! assert_eq!(tt.nnz(), 3);
//! assert_eq!(tt.dims(), &[3, 4, 3]);
//! assert_eq!(tt.normsq(), 14.0);
//! ```

use crate::error::{SparseError, SparseResult};
use crate::parallel;
use crate::utils::compact_domain;
use partensor_core::Scalar;

/// Sparse tensor in coordinate format with mode-major index storage
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpTensor<T> {
    /// Extent of each mode
    pub(crate) dims: Vec<usize>,

    /// One index array per mode, each of length nnz
    pub(crate) ind: Vec<Vec<usize>>,

    /// Values, parallel to every index array
    pub(crate) vals: Vec<T>,

    /// Per-mode local→global index map after compaction
    pub(crate) indmap: Vec<Option<Vec<usize>>>,
}

impl<T: Scalar> SpTensor<T> {
    /// Allocate storage for `nnz` entries of an `nmodes`-way tensor
    ///
    /// Indices and values are zero-filled and every dimension is 0 until
    /// the caller fills the arrays (through [`SpTensor::ind_mut`] and
    /// [`SpTensor::vals_mut`]) and calls [`SpTensor::fill_dims`] or
    /// [`SpTensor::set_dims`].
    pub fn alloc(nnz: usize, nmodes: usize) -> SparseResult<Self> {
        if nmodes == 0 {
            return Err(SparseError::NoModes);
        }

        Ok(Self {
            dims: vec![0; nmodes],
            ind: vec![vec![0; nnz]; nmodes],
            vals: vec![T::zero(); nnz],
            indmap: vec![None; nmodes],
        })
    }

    /// Adopt caller-built index and value arrays and infer the dimensions
    ///
    /// # Errors
    ///
    /// Returns error if there are no index arrays or if any index array
    /// differs in length from `vals`.
    pub fn from_arrays(ind: Vec<Vec<usize>>, vals: Vec<T>) -> SparseResult<Self> {
        if ind.is_empty() {
            return Err(SparseError::NoModes);
        }
        for (mode, inds) in ind.iter().enumerate() {
            if inds.len() != vals.len() {
                return Err(SparseError::LengthMismatch {
                    mode,
                    expected: vals.len(),
                    got: inds.len(),
                });
            }
        }

        let nmodes = ind.len();
        let mut tt = Self {
            dims: vec![0; nmodes],
            ind,
            vals,
            indmap: vec![None; nmodes],
        };
        tt.fill_dims();
        Ok(tt)
    }

    /// Append one nonzero, growing dimensions to cover it
    ///
    /// Does not check for duplicates; run [`SpTensor::remove_duplicates`]
    /// afterwards.
    pub fn push(&mut self, coord: &[usize], val: T) -> SparseResult<()> {
        if coord.len() != self.nmodes() {
            return Err(SparseError::ModeCountMismatch {
                expected: self.nmodes(),
                got: coord.len(),
            });
        }

        for (m, &i) in coord.iter().enumerate() {
            self.ind[m].push(i);
            self.dims[m] = self.dims[m].max(i + 1);
        }
        self.vals.push(val);
        Ok(())
    }

    /// Recompute every dimension as one past the largest observed index
    ///
    /// Each mode is an independent parallel max-reduction.
    pub fn fill_dims(&mut self) {
        for (dim, inds) in self.dims.iter_mut().zip(&self.ind) {
            *dim = parallel::max_plus_one(inds);
        }
    }

    /// Set dimensions explicitly, e.g. when trailing slices are empty
    ///
    /// # Errors
    ///
    /// Returns error if `dims` has the wrong length or does not cover an
    /// existing index.
    pub fn set_dims(&mut self, dims: Vec<usize>) -> SparseResult<()> {
        if dims.len() != self.nmodes() {
            return Err(SparseError::ModeCountMismatch {
                expected: self.nmodes(),
                got: dims.len(),
            });
        }
        for (mode, (&dim, inds)) in dims.iter().zip(&self.ind).enumerate() {
            if let Some(&index) = inds.iter().find(|&&i| i >= dim) {
                return Err(SparseError::IndexOutOfBounds { mode, index, dim });
            }
        }
        self.dims = dims;
        Ok(())
    }

    /// Sum of squared values
    pub fn normsq(&self) -> T {
        self.vals.iter().fold(T::zero(), |acc, &v| acc + v * v)
    }

    /// Rough sparsity descriptor: `∏ₘ nnz^(1/nmodes) / dims[m]`
    ///
    /// Equals `nnz / ∏ dims` up to rounding; computing it as a product of
    /// per-mode ratios keeps it finite for tensors whose dense size
    /// overflows.
    pub fn density(&self) -> f64 {
        let root = (self.nnz() as f64).powf(1.0 / self.nmodes() as f64);
        self.dims
            .iter()
            .fold(1.0, |density, &dim| density * root / dim as f64)
    }

    /// Sorted distinct indices that occur along `mode`
    pub fn unique_slices(&self, mode: usize) -> SparseResult<Vec<usize>> {
        SparseError::check_mode(mode, self.nmodes())?;
        Ok(compact_domain(&self.ind[mode]))
    }

    /// Number of entries in every slice of `mode`, sized to `dims[mode]`
    ///
    /// # Errors
    ///
    /// Returns error if `mode` is out of range or an index of `mode` is not
    /// below `dims[mode]`, e.g. after [`SpTensor::ind_mut`] without
    /// [`SpTensor::fill_dims`].
    pub fn mode_histogram(&self, mode: usize) -> SparseResult<Vec<usize>> {
        SparseError::check_mode(mode, self.nmodes())?;
        let dim = self.dims[mode];
        if let Some(&index) = self.ind[mode].iter().find(|&&i| i >= dim) {
            return Err(SparseError::IndexOutOfBounds { mode, index, dim });
        }
        Ok(parallel::histogram(&self.ind[mode], dim))
    }
}

impl<T> SpTensor<T> {
    /// Number of stored nonzeros
    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    /// Number of modes
    pub fn nmodes(&self) -> usize {
        self.ind.len()
    }

    /// Extent of each mode
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Index array of `mode`
    ///
    /// # Panics
    ///
    /// Panics if `mode >= nmodes()`.
    pub fn ind(&self, mode: usize) -> &[usize] {
        &self.ind[mode]
    }

    /// Mutable index array of `mode`
    ///
    /// The caller is responsible for keeping indices below `dims[mode]`,
    /// e.g. by calling [`SpTensor::fill_dims`] afterwards.
    pub fn ind_mut(&mut self, mode: usize) -> &mut [usize] {
        &mut self.ind[mode]
    }

    /// Values
    pub fn vals(&self) -> &[T] {
        &self.vals
    }

    /// Mutable values
    pub fn vals_mut(&mut self) -> &mut [T] {
        &mut self.vals
    }

    /// Local→global index map of `mode`, if compaction relabelled it
    pub fn indmap(&self, mode: usize) -> Option<&[usize]> {
        self.indmap.get(mode).and_then(|map| map.as_deref())
    }

    /// Global index of a (possibly compacted) local index along `mode`
    pub fn to_global(&self, mode: usize, local: usize) -> usize {
        match self.indmap(mode) {
            Some(map) => map[local],
            None => local,
        }
    }

    /// Full coordinate of entry `n`
    pub fn coord(&self, n: usize) -> Vec<usize> {
        self.ind.iter().map(|inds| inds[n]).collect()
    }
}
