//! Driver-owned staging buffers for row exchanges
//!
//! The driver allocates one [`ExchangeBuffers`] per factorization and lends
//! it to every update and reduction. Updates gather outgoing rows into
//! `send` and receive into `recv`; reductions use the same two buffers with
//! the manifests swapped.

use crate::comm::Communicator;
use crate::error::{ExchangeError, ExchangeResult};
use crate::partition::PartitionDescriptor;
use partensor_core::Scalar;

/// Send and receive staging buffers
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeBuffers<T> {
    pub send: Vec<T>,
    pub recv: Vec<T>,
}

impl<T: Scalar> ExchangeBuffers<T> {
    /// Two zeroed buffers of `len` elements
    pub fn with_len(len: usize) -> Self {
        Self {
            send: vec![T::zero(); len],
            recv: vec![T::zero(); len],
        }
    }

    /// Buffers large enough for every mode of `partition` with `nfactors`
    /// columns
    pub fn for_partition<C: Communicator>(partition: &PartitionDescriptor<C>, nfactors: usize) -> Self {
        Self::with_len(partition.required_buffer_len(nfactors))
    }
}

impl<T> ExchangeBuffers<T> {
    /// Fail unless `send` holds `send_len` and `recv` holds `recv_len` elements
    pub(crate) fn ensure(&self, send_len: usize, recv_len: usize) -> ExchangeResult<()> {
        for (needed, got) in [(send_len, self.send.len()), (recv_len, self.recv.len())] {
            if got < needed {
                return Err(ExchangeError::BufferTooSmall { needed, got });
            }
        }
        Ok(())
    }
}
