//! # partensor-dist
//!
//! Row-distributed factor matrices for sparse tensor factorization.
//!
//! Every rank of a process grid owns a contiguous block of rows of each
//! factor matrix and keeps ghost copies of the rows its tensor slice reads.
//! This crate keeps those copies consistent:
//!
//! - [`Communicator`]: the message-passing contract (point-to-point,
//!   barrier, variable all-to-all, scalar reduction)
//! - [`LocalCluster`]: an in-process implementation on crossbeam channels,
//!   one thread per rank
//! - [`PartitionDescriptor`]: per-mode ownership ranges and the send and
//!   receive [`RowManifest`]s of each rank
//! - [`RowExchange`]: ghost updates, partial-row reductions and the
//!   owned-row copies between local and global matrices
//! - [`collect_time_stats`]: grid-wide timing summary
//!
//! ## Features
//!
//! - `parallel` (default): gather and scatter large row sets on the thread
//!   pool
//! - `serde`: serialization of manifests, layouts, configuration and
//!   timing reports
//!
//! Runtime knobs live in [`ExchangeConfig`]; see
//! [`ExchangeConfig::from_env`] for the environment variables.

#![deny(warnings)]

pub mod buffers;
pub mod comm;
pub mod config;
pub mod error;
pub mod exchange;
pub mod local;
pub mod partition;
pub mod stats;

pub use buffers::ExchangeBuffers;
pub use comm::{CommError, CommResult, Communicator, MessageKind, ReduceOp, Request};
pub use config::ExchangeConfig;
pub use error::{ExchangeError, ExchangeResult};
pub use exchange::RowExchange;
pub use local::{LocalCluster, LocalComm, LocalRequest};
pub use partition::{ModeLayout, PartitionDescriptor, RowManifest};
pub use stats::{collect_time_stats, PhaseStat, TimingReport, REPORTED_PHASES};
