//! Cross-rank timing statistics
//!
//! [`collect_time_stats`] reduces the dominant phase timers of every rank to
//! rank 0 of the grid and reports the mean and the slowest rank per phase.
//! It is diagnostics only: a failed reduction is logged and yields `None`.

use crate::comm::{CommResult, Communicator, ReduceOp};
use crate::partition::PartitionDescriptor;
use partensor_core::{Phase, PhaseTimers};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Phases reported by [`collect_time_stats`], in report order
pub const REPORTED_PHASES: [Phase; 4] = [Phase::Mttkrp, Phase::Mpi, Phase::MpiIdle, Phase::MpiComm];

/// Mean and maximum of one phase across ranks
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseStat {
    pub phase: Phase,
    pub avg_seconds: f64,
    pub max_seconds: f64,
}

/// Grid-wide timing summary
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingReport {
    /// Ranks that contributed
    pub npes: usize,
    pub phases: Vec<PhaseStat>,
}

impl TimingReport {
    /// Statistics for `phase`, if it is reported
    pub fn phase(&self, phase: Phase) -> Option<&PhaseStat> {
        self.phases.iter().find(|s| s.phase == phase)
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timing across {} ranks (avg / max seconds)", self.npes)?;
        for stat in &self.phases {
            writeln!(
                f,
                "  {:<10} {:>10.4} / {:>10.4}",
                stat.phase.name(),
                stat.avg_seconds,
                stat.max_seconds
            )?;
        }
        Ok(())
    }
}

/// Value of `phase` as reported: [`Phase::Mpi`] is the sum of its components
fn reported_seconds(timers: &PhaseTimers, phase: Phase) -> f64 {
    match phase {
        Phase::Mpi => timers.mpi_total_seconds(),
        other => timers.seconds(other),
    }
}

/// Reduce the timers of every grid rank to rank 0
///
/// Collective over the grid communicator. Returns the report on rank 0 and
/// `None` elsewhere, or everywhere if a reduction fails.
pub fn collect_time_stats<C: Communicator>(
    partition: &PartitionDescriptor<C>,
    timers: &PhaseTimers,
) -> Option<TimingReport> {
    match reduce_phases(partition.grid_comm(), timers) {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!(error = %err, "could not collect timing statistics");
            None
        }
    }
}

fn reduce_phases<C: Communicator>(comm: &C, timers: &PhaseTimers) -> CommResult<Option<TimingReport>> {
    let local: Vec<f64> = REPORTED_PHASES
        .iter()
        .map(|&p| reported_seconds(timers, p))
        .collect();

    let mut sums = Vec::with_capacity(local.len());
    for &v in &local {
        sums.push(comm.reduce_f64(v, ReduceOp::Sum, 0)?);
    }
    let mut maxes = Vec::with_capacity(local.len());
    for &v in &local {
        maxes.push(comm.reduce_f64(v, ReduceOp::Max, 0)?);
    }

    let npes = comm.size();
    let phases = REPORTED_PHASES
        .iter()
        .zip(sums.into_iter().zip(maxes))
        .map(|(&phase, (sum, max))| {
            Some(PhaseStat {
                phase,
                avg_seconds: sum? / npes as f64,
                max_seconds: max?,
            })
        })
        .collect::<Option<Vec<_>>>();

    Ok(phases.map(|phases| TimingReport { npes, phases }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalCluster;
    use std::time::Duration;

    #[test]
    fn test_single_rank_report() {
        let timers = PhaseTimers::new();
        timers.record(Phase::Mttkrp, Duration::from_millis(500));
        timers.record(Phase::MpiReduce, Duration::from_millis(250));
        timers.record(Phase::MpiUpdate, Duration::from_millis(250));

        let comm = LocalCluster::new(1).into_comms().remove(0);
        let report = reduce_phases(&comm, &timers).unwrap().unwrap();

        assert_eq!(report.npes, 1);
        assert_eq!(report.phase(Phase::Mttkrp).unwrap().avg_seconds, 0.5);
        assert_eq!(report.phase(Phase::Mpi).unwrap().max_seconds, 0.5);
        assert_eq!(report.phase(Phase::MpiIdle).unwrap().avg_seconds, 0.0);
        assert!(report.phase(Phase::MpiAta).is_none());
        assert!(report.to_string().contains("timing across 1 ranks"));
    }
}
