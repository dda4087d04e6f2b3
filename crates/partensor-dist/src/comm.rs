//! Message-passing contract used by the row exchange protocol
//!
//! A [`Communicator`] is one communication group: a fixed set of `size()`
//! ranks that can address each other by index. The protocol needs only a
//! handful of primitives:
//!
//! | primitive      | semantics                                              |
//! |----------------|--------------------------------------------------------|
//! | `barrier`      | returns once every rank of the group has entered it    |
//! | `isend`        | non-blocking send; the returned request must be waited |
//! | `recv`         | blocking receive of exactly `buf.len()` elements       |
//! | `alltoallv`    | variable-size all-to-all, counts/displs in elements    |
//! | `reduce_f64`   | scalar reduction to a root rank                        |
//!
//! Collectives must be entered by every rank of the group in the same
//! order. There is no timeout: a rank that never arrives stalls the group.

use thiserror::Error;

/// Kind of message travelling between two ranks
///
/// Each kind travels in its own context: a pending point-to-point message
/// never matches a collective receive, as with MPI communicator contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    PointToPoint,
    AllToAll,
    Reduce,
}

impl MessageKind {
    /// Number of message kinds
    pub const COUNT: usize = 3;

    /// Index of this kind's context
    pub fn context(self) -> usize {
        self as usize
    }
}

/// Errors reported by a communicator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    #[error("Rank {rank} out of range for a group of {size}")]
    InvalidRank { rank: usize, size: usize },

    #[error("{what} has {got} entries, expected one per rank ({expected})")]
    ArityMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Segment {displ}..{displ}+{count} exceeds buffer of length {len}")]
    SegmentOutOfBounds {
        displ: usize,
        count: usize,
        len: usize,
    },

    #[error("Rank {peer} sent {got} elements, expected {expected}")]
    LengthMismatch {
        peer: usize,
        expected: usize,
        got: usize,
    },

    #[error("Rank {peer} sent a payload of a different element type")]
    TypeMismatch { peer: usize },

    #[error("Rank {peer} disconnected")]
    Disconnected { peer: usize },
}

/// Result type alias for communicator operations
pub type CommResult<T> = Result<T, CommError>;

/// Scalar reduction operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Max,
}

impl ReduceOp {
    /// Combine two partial results
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Max => a.max(b),
        }
    }
}

/// Handle of an outstanding non-blocking send
pub trait Request {
    /// Block until the send buffer may be reused
    fn wait(self) -> CommResult<()>;
}

/// A communication group
pub trait Communicator {
    type Request: Request;

    /// Index of this rank in the group
    fn rank(&self) -> usize;

    /// Number of ranks in the group
    fn size(&self) -> usize;

    fn barrier(&self) -> CommResult<()>;

    /// Start sending `buf` to `dest`
    fn isend<T: Copy + Send + 'static>(&self, buf: &[T], dest: usize) -> CommResult<Self::Request>;

    /// Receive exactly `buf.len()` elements from `src`
    fn recv<T: Copy + Send + 'static>(&self, buf: &mut [T], src: usize) -> CommResult<()>;

    /// Variable-size all-to-all
    ///
    /// Rank `p` receives `send[send_displs[p]..][..send_counts[p]]` into its
    /// `recv[recv_displs[me]..][..recv_counts[me]]`. Counts and
    /// displacements are in elements, one per rank of the group.
    fn alltoallv<T: Copy + Send + 'static>(
        &self,
        send: &[T],
        send_counts: &[usize],
        send_displs: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
        recv_displs: &[usize],
    ) -> CommResult<()>;

    /// Reduce one value per rank to `root`; only the root gets `Some`
    fn reduce_f64(&self, value: f64, op: ReduceOp, root: usize) -> CommResult<Option<f64>>;
}

/// Check that `counts`/`displs` describe segments inside a buffer of `len`
pub(crate) fn check_segments(
    what: &'static str,
    counts: &[usize],
    displs: &[usize],
    size: usize,
    len: usize,
) -> CommResult<()> {
    for got in [counts.len(), displs.len()] {
        if got != size {
            return Err(CommError::ArityMismatch {
                what,
                expected: size,
                got,
            });
        }
    }
    for (&count, &displ) in counts.iter().zip(displs) {
        if displ.checked_add(count).map_or(true, |end| end > len) {
            return Err(CommError::SegmentOutOfBounds { displ, count, len });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_op() {
        assert_eq!(ReduceOp::Sum.apply(1.5, 2.0), 3.5);
        assert_eq!(ReduceOp::Max.apply(1.5, 2.0), 2.0);
    }

    #[test]
    fn test_check_segments() {
        assert!(check_segments("send", &[2, 1], &[0, 2], 2, 3).is_ok());
        assert_eq!(
            check_segments("send", &[2], &[0], 2, 3),
            Err(CommError::ArityMismatch {
                what: "send",
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            check_segments("recv", &[2, 2], &[0, 2], 2, 3),
            Err(CommError::SegmentOutOfBounds {
                displ: 2,
                count: 2,
                len: 3
            })
        );
    }
}
