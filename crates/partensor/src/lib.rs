//! # partensor
//!
//! Building blocks for distributed sparse tensor factorization.
//!
//! This is the **meta crate** that re-exports the partensor components:
//!
//! - [`core`]: the scalar bound, phase timers and logging setup
//! - [`sparse`]: the coordinate-format tensor store with canonicalisation,
//!   union and unfolding
//! - [`dist`]: partition descriptors and the ghost-row exchange protocol
//!
//! ## Quick Start
//!
//! ```
//! use partensor::prelude::*;
//!
//! // Two nonzeros at the same coordinate and two empty slices per mode
//! let mut tt = SpTensor::from_arrays(
//!     vec![vec![0, 3, 3, 3], vec![1, 1, 4, 4]],
//!     vec![1.0, 2.0, 3.0, 0.5],
//! )?;
//!
//! assert_eq!(tt.remove_duplicates(), 1);
//! assert_eq!(tt.remove_empty_slices(), 5);
//! assert_eq!(tt.dims(), &[2, 2]);
//! assert_eq!(tt.indmap(0), Some(&[0, 3][..]));
//!
//! let csr = tt.unfold(1)?;
//! assert_eq!(csr.shape(), (2, 2));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Exchanging rows
//!
//! ```
//! use partensor::prelude::*;
//! use scirs2_core::ndarray_ext::Array2;
//!
//! // A single rank owning rows 0..3 that also caches row 2 in local slot 3
//! let layout = ModeLayout {
//!     mat_start: 0,
//!     mat_end: 3,
//!     own_start: 0,
//!     nowned: 3,
//!     send: RowManifest::from_neighbor_lists(vec![vec![2]]),
//!     recv: RowManifest::from_neighbor_lists(vec![vec![3]]),
//! };
//! let layer = LocalCluster::new(1).into_comms().remove(0);
//! let grid = LocalCluster::new(1).into_comms().remove(0);
//! let part = PartitionDescriptor::new(vec![layout], vec![layer], grid)?;
//!
//! let timers = PhaseTimers::new();
//! let ex = RowExchange::new(&part).with_timers(&timers);
//! let global = Array2::from_shape_fn((3, 2), |(i, j)| (i * 2 + j) as f64);
//! let mut local = Array2::<f64>::zeros((4, 2));
//! let mut bufs = ExchangeBuffers::for_partition(&part, 2);
//!
//! ex.update_rows(0, &mut bufs, &mut local, &global)?;
//! assert_eq!(local.row(3), global.row(2));
//! assert_eq!(timers.call_count(Phase::MpiUpdate), 1);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Features
//!
//! - `parallel` (default): thread-pool kernels in the sparse and dist crates
//! - `serde`: serialization support across all crates
//! - `tracing`: enable the `tracing-subscriber` backed [`core::init_tracing`]

#![deny(warnings)]

pub use partensor_core as core;
pub use partensor_dist as dist;
pub use partensor_sparse as sparse;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use partensor::prelude::*;
    //!
    //! let tt = SpTensor::<f64>::alloc(0, 3).unwrap();
    //! assert_eq!(tt.nmodes(), 3);
    //! ```

    // Core
    pub use crate::core::{Instrumentation, Phase, PhaseScope, PhaseTimers, Scalar};

    // Sparse tensor store
    pub use crate::sparse::{ColumnLayout, CsrMatrix, SpTensor, SparseError};

    // Distribution and exchange
    pub use crate::dist::{
        collect_time_stats, Communicator, ExchangeBuffers, ExchangeConfig, ExchangeError,
        LocalCluster, LocalComm, ModeLayout, PartitionDescriptor, Request, RowExchange,
        RowManifest, TimingReport,
    };
}
