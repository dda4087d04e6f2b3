//! Canonical form: duplicate-free, compacted sparse tensors
//!
//! - [`SpTensor::remove_duplicates`] merges entries that share a full
//!   coordinate by summing their values.
//! - [`SpTensor::remove_empty_slices`] relabels every mode onto a dense index
//!   range and records the local→global map in `indmap`.
//!
//! # Examples
//!
//! ```
//! use partensor_sparse::SpTensor;
//!
//! let mut tt = SpTensor::from_arrays(
//!     vec![vec![0, 0, 1], vec![0, 0, 1], vec![0, 0, 1]],
//!     vec![2.0, 3.0, 4.0],
//! ).unwrap();
//!
//! assert_eq!(tt.remove_duplicates(), 1);
//! assert_eq!(tt.vals(), &[5.0, 4.0]);
//! ```

use crate::sort::cmp_entries;
use crate::sptensor::SpTensor;
use partensor_core::Scalar;
use std::cmp::Ordering;

/// Slot marker for an index value that no entry references
const EMPTY: usize = usize::MAX;

impl<T: Scalar> SpTensor<T> {
    /// Merge entries with identical coordinates, summing their values
    ///
    /// Sorts by mode 0 first, so it is correct on unsorted input. The first
    /// entry of every coordinate class keeps the class sum.
    ///
    /// Returns the number of entries removed.
    pub fn remove_duplicates(&mut self) -> usize {
        let nnz = self.nnz();
        if nnz <= 1 {
            return 0;
        }

        self.sort_unchecked(0);

        let all_modes: Vec<usize> = (0..self.nmodes()).collect();
        let mut write = 0;
        for read in 1..nnz {
            if cmp_entries(&self.ind, &all_modes, write, read) == Ordering::Equal {
                let v = self.vals[read];
                self.vals[write] = self.vals[write] + v;
            } else {
                write += 1;
                if write != read {
                    for inds in self.ind.iter_mut() {
                        inds[write] = inds[read];
                    }
                    self.vals[write] = self.vals[read];
                }
            }
        }

        let newnnz = write + 1;
        for inds in self.ind.iter_mut() {
            inds.truncate(newnnz);
        }
        self.vals.truncate(newnnz);

        tracing::debug!(removed = nnz - newnnz, nnz = newnnz, "removed duplicate nonzeros");
        nnz - newnnz
    }

    /// Drop index values that no entry references, mode by mode
    ///
    /// Referenced values keep their relative order and are relabelled onto
    /// `0..dims'[m]`; `indmap[m]` then maps each new label back to the
    /// original global index. A mode with no empty slice is left untouched,
    /// including any map it already has. Compacting an already compacted
    /// mode composes the maps, so the result always refers to the original
    /// global indices and a second call is a no-op.
    ///
    /// Returns the total number of removed slices across all modes.
    ///
    /// # Panics
    ///
    /// Panics if an index is not below its mode's dimension, which only
    /// happens after [`SpTensor::ind_mut`] without [`SpTensor::fill_dims`].
    pub fn remove_empty_slices(&mut self) -> usize {
        let maxdim = self.dims.iter().copied().max().unwrap_or(0);
        let mut slots = vec![EMPTY; maxdim];
        let mut nremoved = 0;

        for m in 0..self.nmodes() {
            let dim = self.dims[m];
            let slots = &mut slots[..dim];
            slots.fill(EMPTY);

            let mut nslices = 0;
            for &i in &self.ind[m] {
                if slots[i] == EMPTY {
                    slots[i] = 0;
                    nslices += 1;
                }
            }

            if nslices == dim {
                continue;
            }
            nremoved += dim - nslices;

            let previous = self.indmap[m].take();
            let mut map = Vec::with_capacity(nslices);
            for (global, slot) in slots.iter_mut().enumerate() {
                if *slot != EMPTY {
                    *slot = map.len();
                    map.push(previous.as_ref().map_or(global, |prev| prev[global]));
                }
            }

            for i in self.ind[m].iter_mut() {
                *i = slots[*i];
            }

            tracing::trace!(mode = m, from = dim, to = nslices, "compacted mode");
            self.dims[m] = nslices;
            self.indmap[m] = Some(map);
        }

        nremoved
    }
}
