//! # partensor-core
//!
//! Shared building blocks for the partensor crates:
//!
//! - [`Scalar`]: the element bound for tensor values and factor matrices
//! - [`timing`]: phase identifiers, the [`Instrumentation`] sink contract and
//!   the stock [`PhaseTimers`] table
//! - [`tracing_support`]: subscriber setup for applications
//!
//! ## Features
//!
//! - `serde`: serialization of [`Phase`] and [`TracingConfig`]
//! - `tracing`: enable `tracing-subscriber` and a working [`init_tracing`]

#![deny(warnings)]

pub mod scalar;
pub mod timing;
pub mod tracing_support;

pub use scalar::Scalar;
pub use timing::{Instrumentation, Phase, PhaseScope, PhaseTimers};
pub use tracing_support::{init_tracing, TracingConfig, TracingFormat};
