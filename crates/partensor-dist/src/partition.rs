//! Per-rank partition descriptor
//!
//! For every mode a rank owns a contiguous block `mat_start..mat_end` of the
//! global factor matrix rows and keeps a local matrix holding every row it
//! touches. Within the local matrix the owned rows sit at
//! `own_start..own_start + nowned`. Two [`RowManifest`]s per mode say which
//! rows move between this rank and each peer of the mode's layer:
//!
//! - `send`: global ids of owned rows each peer needs, grouped by peer
//! - `recv`: local slots each peer fills, grouped by peer
//!
//! Manifests are mutual across ranks: `A.send.counts()[B] == B.recv.counts()[A]`.
//! [`crate::RowExchange::verify_manifests`] checks that collectively.

use crate::comm::Communicator;
use crate::error::{ExchangeError, ExchangeResult};

/// Exclusive prefix sums: the offset of each group
fn prefix_sums(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0, |acc, &c| {
            let d = *acc;
            *acc += c;
            Some(d)
        })
        .collect()
}

/// Row ids grouped by peer, with per-peer counts and offsets in rows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowManifest {
    rows: Vec<usize>,
    counts: Vec<usize>,
    displs: Vec<usize>,
}

impl RowManifest {
    /// Manifest over `rows`, where peer `p` owns the next `counts[p]` ids
    ///
    /// # Errors
    ///
    /// Returns error if the counts do not add up to `rows.len()`.
    pub fn new(rows: Vec<usize>, counts: Vec<usize>) -> ExchangeResult<Self> {
        let total: usize = counts.iter().sum();
        if total != rows.len() {
            return Err(ExchangeError::ManifestCounts {
                total,
                rows: rows.len(),
            });
        }

        let displs = prefix_sums(&counts);
        Ok(Self {
            rows,
            counts,
            displs,
        })
    }

    /// Manifest from one row list per peer
    pub fn from_neighbor_lists(lists: Vec<Vec<usize>>) -> Self {
        let counts: Vec<usize> = lists.iter().map(Vec::len).collect();
        let rows = lists.into_iter().flatten().collect();
        let displs = prefix_sums(&counts);
        Self {
            rows,
            counts,
            displs,
        }
    }

    /// Manifest with nothing to move for any of `npeers` peers
    pub fn empty(npeers: usize) -> Self {
        Self::from_neighbor_lists(vec![Vec::new(); npeers])
    }

    /// All row ids, grouped by peer
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Rows per peer
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Offset of each peer's group in [`RowManifest::rows`]
    pub fn displs(&self) -> &[usize] {
        &self.displs
    }

    pub fn npeers(&self) -> usize {
        self.counts.len()
    }

    /// Total rows across peers
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    /// Row ids exchanged with `peer`
    pub fn peer_rows(&self, peer: usize) -> &[usize] {
        &self.rows[self.displs[peer]..self.displs[peer] + self.counts[peer]]
    }
}

/// Ownership and manifests of one mode
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeLayout {
    /// First global row owned by this rank
    pub mat_start: usize,
    /// One past the last global row owned by this rank
    pub mat_end: usize,
    /// Local row where the owned block starts
    pub own_start: usize,
    /// Number of owned rows stored in the local matrix
    pub nowned: usize,
    /// Owned global rows to send to each peer
    pub send: RowManifest,
    /// Local slots to fill from each peer
    pub recv: RowManifest,
}

impl ModeLayout {
    /// Rows of the global (owned) matrix
    pub fn nglobal_rows(&self) -> usize {
        self.mat_end.saturating_sub(self.mat_start)
    }

    fn validate(&self, mode: usize, npeers: usize) -> ExchangeResult<()> {
        let invalid = |reason: String| Err(ExchangeError::InvalidLayout { mode, reason });

        if self.mat_start > self.mat_end {
            return invalid(format!(
                "owned range {}..{} is reversed",
                self.mat_start, self.mat_end
            ));
        }
        if self.nowned > self.nglobal_rows() {
            return invalid(format!(
                "{} owned rows exceed the owned range of {}",
                self.nowned,
                self.nglobal_rows()
            ));
        }
        for (name, manifest) in [("send", &self.send), ("recv", &self.recv)] {
            if manifest.npeers() != npeers {
                return invalid(format!(
                    "{name} manifest lists {} peers, layer has {npeers}",
                    manifest.npeers()
                ));
            }
        }
        if let Some(&row) = self
            .send
            .rows()
            .iter()
            .find(|&&r| r < self.mat_start || r >= self.mat_end)
        {
            return invalid(format!(
                "send row {row} outside owned range {}..{}",
                self.mat_start, self.mat_end
            ));
        }
        Ok(())
    }
}

/// Everything one rank knows about the partition of every mode
#[derive(Debug)]
pub struct PartitionDescriptor<C> {
    modes: Vec<ModeLayout>,
    layer_comms: Vec<C>,
    grid_comm: C,
}

impl<C: Communicator> PartitionDescriptor<C> {
    /// Bundle layouts with the layer communicator of each mode and the
    /// communicator spanning the whole grid
    ///
    /// # Errors
    ///
    /// Returns error if the number of layouts and layer communicators
    /// differ, or a layout is inconsistent with itself or its layer.
    pub fn new(modes: Vec<ModeLayout>, layer_comms: Vec<C>, grid_comm: C) -> ExchangeResult<Self> {
        if modes.len() != layer_comms.len() {
            return Err(ExchangeError::InvalidLayout {
                mode: modes.len().min(layer_comms.len()),
                reason: format!(
                    "{} layouts but {} layer communicators",
                    modes.len(),
                    layer_comms.len()
                ),
            });
        }
        for (mode, (layout, comm)) in modes.iter().zip(&layer_comms).enumerate() {
            layout.validate(mode, comm.size())?;
        }

        Ok(Self {
            modes,
            layer_comms,
            grid_comm,
        })
    }

    pub fn nmodes(&self) -> usize {
        self.modes.len()
    }

    pub fn mode(&self, mode: usize) -> ExchangeResult<&ModeLayout> {
        self.modes.get(mode).ok_or(ExchangeError::InvalidMode {
            mode,
            nmodes: self.modes.len(),
        })
    }

    /// Communicator of the layer that shares rows of `mode`
    pub fn layer_comm(&self, mode: usize) -> ExchangeResult<&C> {
        self.layer_comms.get(mode).ok_or(ExchangeError::InvalidMode {
            mode,
            nmodes: self.modes.len(),
        })
    }

    pub fn grid_comm(&self) -> &C {
        &self.grid_comm
    }

    /// Rank in the grid
    pub fn rank(&self) -> usize {
        self.grid_comm.rank()
    }

    /// Number of ranks in the grid
    pub fn npes(&self) -> usize {
        self.grid_comm.size()
    }

    /// Elements each exchange buffer needs for factor matrices with
    /// `nfactors` columns
    ///
    /// Updates send `send.total()` rows and receive `recv.total()`;
    /// reductions run the other way, so each buffer must hold the larger of
    /// the two for the busiest mode.
    pub fn required_buffer_len(&self, nfactors: usize) -> usize {
        self.modes
            .iter()
            .map(|l| l.send.total().max(l.recv.total()))
            .max()
            .unwrap_or(0)
            * nfactors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalCluster;

    fn layout() -> ModeLayout {
        ModeLayout {
            mat_start: 4,
            mat_end: 8,
            own_start: 4,
            nowned: 4,
            send: RowManifest::from_neighbor_lists(vec![vec![4, 6, 7], vec![]]),
            recv: RowManifest::from_neighbor_lists(vec![vec![0, 1], vec![]]),
        }
    }

    #[test]
    fn test_manifest_displs() {
        let m = RowManifest::from_neighbor_lists(vec![vec![3, 1], vec![], vec![9]]);
        assert_eq!(m.counts(), &[2, 0, 1]);
        assert_eq!(m.displs(), &[0, 2, 2]);
        assert_eq!(m.peer_rows(2), &[9]);
        assert_eq!(m.total(), 3);
    }

    #[test]
    fn test_manifest_new_checks_total() {
        let m = RowManifest::new(vec![5, 6, 7], vec![1, 2]).unwrap();
        assert_eq!(m.peer_rows(1), &[6, 7]);
        assert!(RowManifest::new(vec![5], vec![1, 1]).is_err());
    }

    #[test]
    fn test_descriptor_accessors() {
        let layer = LocalCluster::new(2).into_comms().remove(1);
        let grid = LocalCluster::new(1).into_comms().remove(0);
        let part = PartitionDescriptor::new(vec![layout()], vec![layer], grid).unwrap();

        assert_eq!(part.nmodes(), 1);
        assert_eq!(part.mode(0).unwrap().nglobal_rows(), 4);
        assert!(part.mode(1).is_err());
        assert_eq!(part.layer_comm(0).unwrap().rank(), 1);
        assert_eq!(part.npes(), 1);
        assert_eq!(part.required_buffer_len(5), 15);
    }

    #[test]
    fn test_descriptor_rejects_send_outside_owned() {
        let mut bad = layout();
        bad.send = RowManifest::from_neighbor_lists(vec![vec![2], vec![]]);
        let layer = LocalCluster::new(2).into_comms().remove(0);
        let grid = LocalCluster::new(1).into_comms().remove(0);

        let err = PartitionDescriptor::new(vec![bad], vec![layer], grid).unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidLayout { mode: 0, .. }));
    }

    #[test]
    fn test_descriptor_rejects_peer_count() {
        let layer = LocalCluster::new(3).into_comms().remove(0);
        let grid = LocalCluster::new(1).into_comms().remove(0);
        assert!(PartitionDescriptor::new(vec![layout()], vec![layer], grid).is_err());
    }
}
