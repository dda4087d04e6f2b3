//! Ghost-row exchange for row-partitioned factor matrices
//!
//! Each mode has two dense `I x F` matrices per rank:
//!
//! - the **global** matrix holds the rows this rank owns, row `r` being
//!   global row `mat_start + r`
//! - the **local** matrix holds every row this rank reads, owned rows at
//!   `own_start..own_start + nowned` and ghost copies elsewhere
//!
//! [`RowExchange`] moves rows between the two and between ranks according
//! to the [`PartitionDescriptor`] manifests:
//!
//! | operation           | direction                                       |
//! |---------------------|-------------------------------------------------|
//! | `update_rows`       | owners' global rows → peers' local ghost rows    |
//! | `send_rows`/`recv_rows` | the same, one peer at a time               |
//! | `reduce_rows`       | peers' local partial rows → owners' global rows  |
//! | `add_my_partials`   | own local rows → own global rows                 |
//!
//! Calls that involve the layer communicator are collective: every rank of
//! the mode's layer must make the same call. An error raised on one rank
//! before the collective leaves its peers blocked in it, as with any
//! message-passing collective.

use crate::buffers::ExchangeBuffers;
use crate::comm::Communicator;
use crate::config::ExchangeConfig;
use crate::error::{ExchangeError, ExchangeResult};
use crate::partition::{ModeLayout, PartitionDescriptor};
use partensor_core::{Instrumentation, Phase, PhaseScope, Scalar};
use scirs2_core::ndarray_ext::Array2;

#[cfg(feature = "parallel")]
use scirs2_core::parallel_ops::*;

/// Row exchange bound to one rank's partition descriptor
pub struct RowExchange<'a, C> {
    partition: &'a PartitionDescriptor<C>,
    timers: Option<&'a dyn Instrumentation>,
    config: ExchangeConfig,
}

impl<'a, C: Communicator> RowExchange<'a, C> {
    pub fn new(partition: &'a PartitionDescriptor<C>) -> Self {
        Self {
            partition,
            timers: None,
            config: ExchangeConfig::default(),
        }
    }

    /// Record phase timings into `timers`
    pub fn with_timers(mut self, timers: &'a dyn Instrumentation) -> Self {
        self.timers = Some(timers);
        self
    }

    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn partition(&self) -> &'a PartitionDescriptor<C> {
        self.partition
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    fn layer(&self, mode: usize) -> ExchangeResult<(&'a ModeLayout, &'a C)> {
        Ok((self.partition.mode(mode)?, self.partition.layer_comm(mode)?))
    }

    fn scope(&self, phase: Phase) -> PhaseScope<'a> {
        PhaseScope::enter(self.timers, phase)
    }

    /// Gather the owned rows `dest` needs and start sending them
    ///
    /// Rows are staged in `send_buf` at the destination's offset in the
    /// send manifest. Returns `None` without communicating when `dest` needs
    /// nothing. The returned request must be waited on before `send_buf` is
    /// reused.
    pub fn send_rows<T: Scalar>(
        &self,
        mode: usize,
        dest: usize,
        send_buf: &mut [T],
        global: &Array2<T>,
    ) -> ExchangeResult<Option<C::Request>> {
        let (layout, comm) = self.layer(mode)?;
        check_peer(dest, comm.size())?;

        let count = layout.send.counts()[dest];
        if count == 0 {
            return Ok(None);
        }

        let nf = global.ncols();
        let start = layout.send.displs()[dest] * nf;
        let end = start + count * nf;
        if send_buf.len() < end {
            return Err(ExchangeError::BufferTooSmall {
                needed: end,
                got: send_buf.len(),
            });
        }

        gather_rows(
            &mut send_buf[start..end],
            rows_of(global)?,
            nf,
            layout.send.peer_rows(dest),
            layout.mat_start,
            self.config.use_parallel(count),
        )?;

        tracing::trace!(mode, dest, rows = count, "posting owned rows");
        Ok(Some(comm.isend(&send_buf[start..end], dest)?))
    }

    /// Receive the rows `src` sends and store them in their local slots
    ///
    /// Blocks until the rows arrive, then refreshes the owned block of
    /// `local` from `global`. The refresh also happens when `src` sends
    /// nothing.
    pub fn recv_rows<T: Scalar>(
        &self,
        mode: usize,
        src: usize,
        recv_buf: &mut [T],
        local: &mut Array2<T>,
        global: &Array2<T>,
    ) -> ExchangeResult<()> {
        let (layout, comm) = self.layer(mode)?;
        check_peer(src, comm.size())?;
        let nf = check_columns(local, global)?;
        check_owned_window(layout, local.nrows(), global.nrows())?;

        let count = layout.recv.counts()[src];
        if count > 0 {
            let slots = layout.recv.peer_rows(src);
            check_rows(slots, 0, local.nrows())?;

            let start = layout.recv.displs()[src] * nf;
            let end = start + count * nf;
            if recv_buf.len() < end {
                return Err(ExchangeError::BufferTooSmall {
                    needed: end,
                    got: recv_buf.len(),
                });
            }

            comm.recv(&mut recv_buf[start..end], src)?;
            scatter_rows(
                rows_of_mut(local)?,
                &recv_buf[start..end],
                nf,
                slots,
                self.config.use_parallel(count),
            )?;
            tracing::trace!(mode, src, rows = count, "received ghost rows");
        }

        self.refresh_owned_rows(mode, local, global)
    }

    /// Refresh every ghost row of `local` from its owner in one collective
    ///
    /// 1. gather every row any peer needs from `global` into `bufs.send`
    /// 2. barrier on the layer communicator
    /// 3. one variable-size all-to-all into `bufs.recv`
    /// 4. scatter `bufs.recv` into the local slots of the receive manifest
    /// 5. refresh the owned block of `local` from `global`
    ///
    /// With [`ExchangeConfig::check_manifests`] set, the manifests are
    /// verified against the peers first.
    pub fn update_rows<T: Scalar>(
        &self,
        mode: usize,
        bufs: &mut ExchangeBuffers<T>,
        local: &mut Array2<T>,
        global: &Array2<T>,
    ) -> ExchangeResult<()> {
        let _update = self.scope(Phase::MpiUpdate);
        let (layout, comm) = self.layer(mode)?;
        let nf = check_columns(local, global)?;
        check_owned_window(layout, local.nrows(), global.nrows())?;
        check_rows(layout.recv.rows(), 0, local.nrows())?;

        let (nsend, nrecv) = (layout.send.total(), layout.recv.total());
        bufs.ensure(nsend * nf, nrecv * nf)?;

        if self.config.check_manifests {
            self.verify_manifests(mode)?;
        }

        gather_rows(
            &mut bufs.send[..nsend * nf],
            rows_of(global)?,
            nf,
            layout.send.rows(),
            layout.mat_start,
            self.config.use_parallel(nsend),
        )?;

        {
            let _idle = self.scope(Phase::MpiIdle);
            comm.barrier()?;
        }
        {
            let _comm = self.scope(Phase::MpiComm);
            comm.alltoallv(
                &bufs.send,
                &scaled(layout.send.counts(), nf),
                &scaled(layout.send.displs(), nf),
                &mut bufs.recv,
                &scaled(layout.recv.counts(), nf),
                &scaled(layout.recv.displs(), nf),
            )?;
        }

        scatter_rows(
            rows_of_mut(local)?,
            &bufs.recv[..nrecv * nf],
            nf,
            layout.recv.rows(),
            self.config.use_parallel(nrecv),
        )?;
        self.refresh_owned_rows(mode, local, global)?;

        tracing::debug!(mode, sent = nsend, received = nrecv, "updated ghost rows");
        Ok(())
    }

    /// Sum every rank's partial rows into the owners' global rows
    ///
    /// The reverse of [`RowExchange::update_rows`]: the local rows named in
    /// the receive manifest travel back to their owners, which add them to
    /// the global rows named in the send manifest. Several peers may
    /// contribute to the same row; each contribution is added once.
    ///
    /// With [`ExchangeConfig::check_manifests`] set, the manifests are
    /// verified against the peers first.
    pub fn reduce_rows<T: Scalar>(
        &self,
        mode: usize,
        bufs: &mut ExchangeBuffers<T>,
        local: &Array2<T>,
        global: &mut Array2<T>,
    ) -> ExchangeResult<()> {
        let _reduce = self.scope(Phase::MpiReduce);
        let (layout, comm) = self.layer(mode)?;
        let nf = check_columns(local, global)?;
        check_rows(layout.send.rows(), layout.mat_start, global.nrows())?;

        let (nsend, nrecv) = (layout.recv.total(), layout.send.total());
        bufs.ensure(nsend * nf, nrecv * nf)?;

        if self.config.check_manifests {
            self.verify_manifests(mode)?;
        }

        gather_rows(
            &mut bufs.send[..nsend * nf],
            rows_of(local)?,
            nf,
            layout.recv.rows(),
            0,
            self.config.use_parallel(nsend),
        )?;

        {
            let _idle = self.scope(Phase::MpiIdle);
            comm.barrier()?;
        }
        {
            let _comm = self.scope(Phase::MpiComm);
            comm.alltoallv(
                &bufs.send,
                &scaled(layout.recv.counts(), nf),
                &scaled(layout.recv.displs(), nf),
                &mut bufs.recv,
                &scaled(layout.send.counts(), nf),
                &scaled(layout.send.displs(), nf),
            )?;
        }

        if nf > 0 {
            let gmat = rows_of_mut(global)?;
            for (&id, partial) in layout
                .send
                .rows()
                .iter()
                .zip(bufs.recv[..nrecv * nf].chunks_exact(nf))
            {
                let row = (id - layout.mat_start) * nf;
                for (g, &p) in gmat[row..row + nf].iter_mut().zip(partial) {
                    *g = *g + p;
                }
            }
        }

        tracing::debug!(mode, sent = nsend, received = nrecv, "reduced partial rows");
        Ok(())
    }

    /// Zero `global`, then copy this rank's owned local rows into it
    ///
    /// The owned block starts at global row `indmap[own_start]` when the
    /// mode was compacted and at `own_start` otherwise.
    pub fn add_my_partials<T: Scalar>(
        &self,
        mode: usize,
        indmap: Option<&[usize]>,
        local: &Array2<T>,
        global: &mut Array2<T>,
    ) -> ExchangeResult<()> {
        let _partials = self.scope(Phase::MpiPartials);
        let layout = self.partition.mode(mode)?;
        let nf = check_columns(local, global)?;
        let nowned = layout.nowned;

        let goffset = if nowned == 0 {
            0
        } else {
            let first = match indmap {
                None => layout.own_start,
                Some(map) => *map.get(layout.own_start).ok_or(ExchangeError::RowOutOfRange {
                    row: layout.own_start,
                    nrows: map.len(),
                })?,
            };
            let goffset = first
                .checked_sub(layout.mat_start)
                .ok_or(ExchangeError::RowOutOfRange {
                    row: first,
                    nrows: layout.mat_end,
                })?;
            check_window(goffset, nowned, global.nrows())?;
            check_window(layout.own_start, nowned, local.nrows())?;
            goffset
        };

        global.fill(T::zero());
        let src = &rows_of(local)?[layout.own_start * nf..(layout.own_start + nowned) * nf];
        rows_of_mut(global)?[goffset * nf..(goffset + nowned) * nf].copy_from_slice(src);
        Ok(())
    }

    /// Copy the owned rows of `global` into the owned block of `local`
    pub fn refresh_owned_rows<T: Scalar>(
        &self,
        mode: usize,
        local: &mut Array2<T>,
        global: &Array2<T>,
    ) -> ExchangeResult<()> {
        let layout = self.partition.mode(mode)?;
        let nf = check_columns(local, global)?;
        check_owned_window(layout, local.nrows(), global.nrows())?;

        let len = layout.nowned * nf;
        let start = layout.own_start * nf;
        rows_of_mut(local)?[start..start + len].copy_from_slice(&rows_of(global)?[..len]);
        Ok(())
    }

    /// Check with every peer that the row counts of both manifests agree
    ///
    /// Collective over the layer of `mode`. Every rank swaps its send and
    /// receive counts with every peer, so both ends of an inconsistent pair
    /// see the mismatch. A second round shares each rank's verdict: when any
    /// rank of the layer finds a mismatch, every rank returns an error and
    /// none goes on into the exchange.
    pub fn verify_manifests(&self, mode: usize) -> ExchangeResult<()> {
        let (layout, comm) = self.layer(mode)?;
        let size = comm.size();
        let (send, recv) = (layout.send.counts(), layout.recv.counts());

        // peer p gets (rows sent to p, rows expected from p)
        let outgoing: Vec<usize> = send.iter().zip(recv).flat_map(|(&s, &r)| [s, r]).collect();
        let pairs = vec![2; size];
        let pair_displs: Vec<usize> = (0..size).map(|p| 2 * p).collect();
        let mut incoming = vec![0usize; 2 * size];
        comm.alltoallv(&outgoing, &pairs, &pair_displs, &mut incoming, &pairs, &pair_displs)?;

        let local = incoming
            .chunks_exact(2)
            .enumerate()
            .find_map(|(peer, theirs)| {
                let (sent, expects) = (theirs[0], theirs[1]);
                if sent != recv[peer] {
                    Some(ExchangeError::ManifestMismatch {
                        mode,
                        peer,
                        sent,
                        expected: recv[peer],
                    })
                } else if expects != send[peer] {
                    Some(ExchangeError::PeerExpects {
                        mode,
                        peer,
                        sending: send[peer],
                        expected: expects,
                    })
                } else {
                    None
                }
            });

        let ones = vec![1; size];
        let displs: Vec<usize> = (0..size).collect();
        let verdict = vec![usize::from(local.is_some()); size];
        let mut verdicts = vec![0usize; size];
        comm.alltoallv(&verdict, &ones, &displs, &mut verdicts, &ones, &displs)?;

        if let Some(err) = local {
            tracing::warn!(mode, error = %err, "manifest mismatch");
            return Err(err);
        }
        if let Some(peer) = verdicts.iter().position(|&v| v != 0) {
            return Err(ExchangeError::PeerManifestFailure { mode, peer });
        }
        tracing::trace!(mode, "manifests agree");
        Ok(())
    }
}

fn check_peer(peer: usize, npeers: usize) -> ExchangeResult<()> {
    if peer < npeers {
        Ok(())
    } else {
        Err(ExchangeError::InvalidPeer { peer, npeers })
    }
}

fn check_columns<T>(local: &Array2<T>, global: &Array2<T>) -> ExchangeResult<usize> {
    if local.ncols() == global.ncols() {
        Ok(global.ncols())
    } else {
        Err(ExchangeError::ColumnMismatch {
            expected: global.ncols(),
            got: local.ncols(),
        })
    }
}

/// Every `id - offset` must be a row of a matrix with `nrows` rows
fn check_rows(ids: &[usize], offset: usize, nrows: usize) -> ExchangeResult<()> {
    match ids
        .iter()
        .find(|&&id| id.checked_sub(offset).map_or(true, |r| r >= nrows))
    {
        Some(&row) => Err(ExchangeError::RowOutOfRange { row, nrows }),
        None => Ok(()),
    }
}

fn check_window(start: usize, len: usize, nrows: usize) -> ExchangeResult<()> {
    if start + len <= nrows {
        Ok(())
    } else {
        Err(ExchangeError::RowOutOfRange {
            row: start + len - 1,
            nrows,
        })
    }
}

fn check_owned_window(layout: &ModeLayout, local_rows: usize, global_rows: usize) -> ExchangeResult<()> {
    check_window(layout.own_start, layout.nowned, local_rows)?;
    check_window(0, layout.nowned, global_rows)
}

fn rows_of<T>(m: &Array2<T>) -> ExchangeResult<&[T]> {
    m.as_slice().ok_or(ExchangeError::NonContiguous)
}

fn rows_of_mut<T>(m: &mut Array2<T>) -> ExchangeResult<&mut [T]> {
    m.as_slice_mut().ok_or(ExchangeError::NonContiguous)
}

/// Row counts or offsets expressed in elements
fn scaled(rows: &[usize], nf: usize) -> Vec<usize> {
    rows.iter().map(|&r| r * nf).collect()
}

/// Copy row `ids[s] - offset` of `src` into row `s` of `dst`
fn gather_rows<T: Scalar>(
    dst: &mut [T],
    src: &[T],
    nf: usize,
    ids: &[usize],
    offset: usize,
    parallel: bool,
) -> ExchangeResult<()> {
    if nf == 0 {
        return Ok(());
    }
    check_rows(ids, offset, src.len() / nf)?;

    let pairs = dst
        .chunks_exact_mut(nf)
        .zip(ids)
        .map(|(row, &id)| {
            let r = (id - offset) * nf;
            (row, &src[r..r + nf])
        })
        .collect();
    copy_rows(pairs, parallel);
    Ok(())
}

/// Copy row `s` of `src` into row `slots[s]` of `dst`
///
/// A slot listed twice is an error; parallel writers must never share a row.
fn scatter_rows<T: Scalar>(
    dst: &mut [T],
    src: &[T],
    nf: usize,
    slots: &[usize],
    parallel: bool,
) -> ExchangeResult<()> {
    if nf == 0 {
        return Ok(());
    }
    check_rows(slots, 0, dst.len() / nf)?;

    let mut targets: Vec<Option<&mut [T]>> = dst.chunks_exact_mut(nf).map(Some).collect();
    let mut pairs = Vec::with_capacity(slots.len());
    for (&slot, row) in slots.iter().zip(src.chunks_exact(nf)) {
        let target = targets[slot]
            .take()
            .ok_or(ExchangeError::DuplicateSlot { row: slot })?;
        pairs.push((target, row));
    }
    copy_rows(pairs, parallel);
    Ok(())
}

#[cfg(feature = "parallel")]
fn copy_rows<T: Scalar>(pairs: Vec<(&mut [T], &[T])>, parallel: bool) {
    if parallel {
        pairs
            .into_par_iter()
            .for_each(|(dst, src)| dst.copy_from_slice(src));
    } else {
        for (dst, src) in pairs {
            dst.copy_from_slice(src);
        }
    }
}

/// Sequential fallback for copy_rows when parallel feature is disabled
#[cfg(not(feature = "parallel"))]
fn copy_rows<T: Scalar>(pairs: Vec<(&mut [T], &[T])>, _parallel: bool) {
    for (dst, src) in pairs {
        dst.copy_from_slice(src);
    }
}
