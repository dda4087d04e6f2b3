//! In-process communicator: one thread per rank
//!
//! [`LocalCluster::new`] wires `size` ranks with one unbounded crossbeam
//! channel per ordered `(src, dst)` pair and [`MessageKind`], plus a shared
//! barrier. Channels are FIFO, so messages of one kind between a pair of
//! ranks arrive in the order they were posted; collectives rely on every
//! rank posting them in the same order. Separate channels per kind let a
//! point-to-point send stay pending across a collective.
//!
//! Payloads are copied into the message, so a send completes as soon as it
//! is posted and [`LocalRequest::wait`] never blocks.
//!
//! # Examples
//!
//! ```
//! use partensor_dist::comm::{Communicator, Request};
//! use partensor_dist::local::LocalCluster;
//!
//! let comms = LocalCluster::new(2).into_comms();
//! std::thread::scope(|s| {
//!     for comm in comms {
//!         s.spawn(move || {
//!             let peer = 1 - comm.rank();
//!             let req = comm.isend(&[comm.rank() as f64], peer).unwrap();
//!             let mut got = [0.0];
//!             comm.recv(&mut got, peer).unwrap();
//!             req.wait().unwrap();
//!             assert_eq!(got[0], peer as f64);
//!         });
//!     }
//! });
//! ```

use crate::comm::{check_segments, CommError, CommResult, Communicator, MessageKind, ReduceOp, Request};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::any::Any;
use std::sync::{Arc, Barrier};

/// Type-erased `Vec<T>` payload
type Payload = Box<dyn Any + Send>;

/// One channel end per message kind
type Lanes<E> = [E; MessageKind::COUNT];

/// A set of connected in-process ranks
pub struct LocalCluster {
    comms: Vec<LocalComm>,
}

impl LocalCluster {
    /// Connect `size` ranks
    pub fn new(size: usize) -> Self {
        let mut senders: Vec<Vec<Lanes<Sender<Payload>>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut receivers: Vec<Vec<Lanes<Receiver<Payload>>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();

        // senders[src][dst] pairs with receivers[dst][src]
        for src_senders in senders.iter_mut() {
            for dst_receivers in receivers.iter_mut() {
                let lanes: Lanes<(Sender<Payload>, Receiver<Payload>)> =
                    std::array::from_fn(|_| unbounded());
                src_senders.push(lanes.each_ref().map(|(tx, _)| tx.clone()));
                dst_receivers.push(lanes.map(|(_, rx)| rx));
            }
        }

        let barrier = Arc::new(Barrier::new(size.max(1)));
        let comms = senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outbox, inbox))| LocalComm {
                rank,
                size,
                outbox,
                inbox,
                barrier: Arc::clone(&barrier),
            })
            .collect();

        Self { comms }
    }

    pub fn size(&self) -> usize {
        self.comms.len()
    }

    /// One communicator per rank, in rank order
    pub fn into_comms(self) -> Vec<LocalComm> {
        self.comms
    }
}

/// One rank's endpoint of a [`LocalCluster`]
pub struct LocalComm {
    rank: usize,
    size: usize,
    /// outbox[dst][kind]
    outbox: Vec<Lanes<Sender<Payload>>>,
    /// inbox[src][kind]
    inbox: Vec<Lanes<Receiver<Payload>>>,
    barrier: Arc<Barrier>,
}

impl std::fmt::Debug for LocalComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

/// Completed send
#[derive(Debug)]
pub struct LocalRequest;

impl Request for LocalRequest {
    fn wait(self) -> CommResult<()> {
        Ok(())
    }
}

impl LocalComm {
    fn check_rank(&self, rank: usize) -> CommResult<()> {
        if rank < self.size {
            Ok(())
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.size,
            })
        }
    }

    fn post<T: Copy + Send + 'static>(&self, kind: MessageKind, data: Vec<T>, dest: usize) -> CommResult<()> {
        self.check_rank(dest)?;
        self.outbox[dest][kind.context()]
            .send(Box::new(data))
            .map_err(|_| CommError::Disconnected { peer: dest })
    }

    fn take<T: Copy + Send + 'static>(&self, kind: MessageKind, src: usize) -> CommResult<Vec<T>> {
        self.check_rank(src)?;
        let payload = self.inbox[src][kind.context()]
            .recv()
            .map_err(|_| CommError::Disconnected { peer: src })?;
        payload
            .downcast::<Vec<T>>()
            .map(|data| *data)
            .map_err(|_| CommError::TypeMismatch { peer: src })
    }
}

impl Communicator for LocalComm {
    type Request = LocalRequest;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> CommResult<()> {
        self.barrier.wait();
        Ok(())
    }

    fn isend<T: Copy + Send + 'static>(&self, buf: &[T], dest: usize) -> CommResult<LocalRequest> {
        self.post(MessageKind::PointToPoint, buf.to_vec(), dest)?;
        Ok(LocalRequest)
    }

    fn recv<T: Copy + Send + 'static>(&self, buf: &mut [T], src: usize) -> CommResult<()> {
        let data = self.take::<T>(MessageKind::PointToPoint, src)?;
        if data.len() != buf.len() {
            return Err(CommError::LengthMismatch {
                peer: src,
                expected: buf.len(),
                got: data.len(),
            });
        }
        buf.copy_from_slice(&data);
        Ok(())
    }

    fn alltoallv<T: Copy + Send + 'static>(
        &self,
        send: &[T],
        send_counts: &[usize],
        send_displs: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
        recv_displs: &[usize],
    ) -> CommResult<()> {
        check_segments("send counts", send_counts, send_displs, self.size, send.len())?;
        check_segments("recv counts", recv_counts, recv_displs, self.size, recv.len())?;

        for dest in 0..self.size {
            let segment = &send[send_displs[dest]..send_displs[dest] + send_counts[dest]];
            self.post(MessageKind::AllToAll, segment.to_vec(), dest)?;
        }

        for src in 0..self.size {
            let data = self.take::<T>(MessageKind::AllToAll, src)?;
            if data.len() != recv_counts[src] {
                return Err(CommError::LengthMismatch {
                    peer: src,
                    expected: recv_counts[src],
                    got: data.len(),
                });
            }
            recv[recv_displs[src]..recv_displs[src] + data.len()].copy_from_slice(&data);
        }
        Ok(())
    }

    fn reduce_f64(&self, value: f64, op: ReduceOp, root: usize) -> CommResult<Option<f64>> {
        self.post(MessageKind::Reduce, vec![value], root)?;
        if self.rank != root {
            return Ok(None);
        }

        let mut acc: Option<f64> = None;
        for src in 0..self.size {
            let data = self.take::<f64>(MessageKind::Reduce, src)?;
            let &[v] = data.as_slice() else {
                return Err(CommError::LengthMismatch {
                    peer: src,
                    expected: 1,
                    got: data.len(),
                });
            };
            acc = Some(acc.map_or(v, |a| op.apply(a, v)));
        }
        Ok(acc)
    }
}
