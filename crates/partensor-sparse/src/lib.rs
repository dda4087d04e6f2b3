//! # partensor-sparse
//!
//! Sparse tensor store for distributed factorization.
//!
//! This crate provides:
//! - [`SpTensor`]: coordinate-format tensor with one index array per mode
//! - Canonicalisation: mode-major sorting, duplicate merging and
//!   empty-slice compaction with a local→global index map
//! - Union of two tensors by sorted merge
//! - Unfolding to [`CsrMatrix`] through the [`ColumnLayout`] bijection
//! - [`utils::compact_domain`]: distinct values of an index multiset
//!
//! ## Features
//!
//! - `parallel` (default): rayon kernels via `scirs2_core::parallel_ops`
//! - `serde`: serialization of [`SpTensor`]

#![deny(warnings)]

pub mod canonical;
pub mod csr;
pub mod error;
pub mod parallel;
pub mod sort;
pub mod sptensor;
pub mod union;
pub mod unfold;
pub mod utils;

// Re-exports
pub use csr::{CsrError, CsrMatrix};
pub use error::{SparseError, SparseResult};
pub use sort::mode_order;
pub use sptensor::SpTensor;
pub use unfold::ColumnLayout;
