//! Error types for partition descriptors and the row exchange protocol
//!
//! Every precondition of the protocol (manifest consistency, buffer sizes,
//! row ranges) is checked before any data moves, so an error leaves the
//! factor matrices untouched unless the communicator itself failed midway.

use crate::comm::CommError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Mode {mode} out of range for a partition with {nmodes} modes")]
    InvalidMode { mode: usize, nmodes: usize },

    #[error("Peer {peer} out of range for a layer of {npeers} ranks")]
    InvalidPeer { peer: usize, npeers: usize },

    #[error("Invalid layout for mode {mode}: {reason}")]
    InvalidLayout { mode: usize, reason: String },

    #[error("Manifest counts add up to {total} but {rows} rows are listed")]
    ManifestCounts { total: usize, rows: usize },

    #[error("Buffer too small: need {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    #[error("Factor matrices disagree on column count: {expected} vs {got}")]
    ColumnMismatch { expected: usize, got: usize },

    #[error("Row {row} out of range for a matrix with {nrows} rows")]
    RowOutOfRange { row: usize, nrows: usize },

    #[error("Local row {row} is filled twice by one exchange")]
    DuplicateSlot { row: usize },

    #[error("Factor matrix is not stored contiguously in row-major order")]
    NonContiguous,

    #[error("Mode {mode}: rank {peer} sends {sent} rows but {expected} are expected")]
    ManifestMismatch {
        mode: usize,
        peer: usize,
        sent: usize,
        expected: usize,
    },

    #[error("Mode {mode}: sending {sending} rows to rank {peer}, which expects {expected}")]
    PeerExpects {
        mode: usize,
        peer: usize,
        sending: usize,
        expected: usize,
    },

    #[error("Mode {mode}: rank {peer} found a manifest mismatch")]
    PeerManifestFailure { mode: usize, peer: usize },

    #[error("Communication error: {0}")]
    Comm(#[from] CommError),
}

/// Result type alias for exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;
