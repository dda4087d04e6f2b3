//! Element type bound shared by the tensor store and the exchange protocol

use scirs2_core::numeric::Float;
use std::fmt::Debug;

/// Floating-point value that can be stored in a sparse tensor and shipped
/// between ranks
///
/// Blanket-implemented for every `Float` that is thread-safe and `'static`,
/// which in practice means `f32` and `f64`.
pub trait Scalar: Float + Send + Sync + Debug + 'static {}

impl<T> Scalar for T where T: Float + Send + Sync + Debug + 'static {}
