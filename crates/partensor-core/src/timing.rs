//! Phase timing for the factorization driver and the exchange protocol
//!
//! The protocol never owns a timer table. It is handed an optional
//! [`Instrumentation`] sink and brackets its dominant phases with
//! [`PhaseScope`] guards; whoever owns the sink decides what to do with the
//! numbers. [`PhaseTimers`] is the stock sink: one accumulating wall-clock
//! timer per [`Phase`].
//!
//! # Example
//!
//! ```
//! use partensor_core::timing::{Instrumentation, Phase, PhaseScope, PhaseTimers};
//!
//! let timers = PhaseTimers::new();
//! {
//!     let _scope = PhaseScope::enter(Some(&timers), Phase::MpiComm);
//!     // ... exchange rows ...
//! }
//! assert_eq!(timers.call_count(Phase::MpiComm), 1);
//! ```

use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A timed phase of a distributed factorization iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Phase {
    /// Local tensor contraction (the numeric kernel)
    Mttkrp,
    /// Aggregate of all communication phases
    Mpi,
    /// Waiting in barriers
    MpiIdle,
    /// Moving data in collectives
    MpiComm,
    /// Gram matrix all-reduce
    MpiAta,
    /// Partial row reduction to owners
    MpiReduce,
    /// Seeding global matrices from local partials
    MpiPartials,
    /// Column norm all-reduce
    MpiNorm,
    /// Ghost row update
    MpiUpdate,
    /// Fit computation all-reduce
    MpiFit,
}

impl Phase {
    /// Number of phases
    pub const COUNT: usize = 10;

    /// All phases in table order
    pub const ALL: [Phase; Phase::COUNT] = [
        Phase::Mttkrp,
        Phase::Mpi,
        Phase::MpiIdle,
        Phase::MpiComm,
        Phase::MpiAta,
        Phase::MpiReduce,
        Phase::MpiPartials,
        Phase::MpiNorm,
        Phase::MpiUpdate,
        Phase::MpiFit,
    ];

    /// Communication phases folded into [`Phase::Mpi`]
    pub const MPI_COMPONENTS: [Phase; 6] = [
        Phase::MpiAta,
        Phase::MpiReduce,
        Phase::MpiPartials,
        Phase::MpiNorm,
        Phase::MpiUpdate,
        Phase::MpiFit,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    /// Short human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Phase::Mttkrp => "mttkrp",
            Phase::Mpi => "mpi",
            Phase::MpiIdle => "mpi_idle",
            Phase::MpiComm => "mpi_comm",
            Phase::MpiAta => "mpi_ata",
            Phase::MpiReduce => "mpi_reduce",
            Phase::MpiPartials => "mpi_partials",
            Phase::MpiNorm => "mpi_norm",
            Phase::MpiUpdate => "mpi_update",
            Phase::MpiFit => "mpi_fit",
        }
    }
}

/// Scoped-interval instrumentation sink
///
/// `start` and `stop` for the same phase always come in pairs from the
/// thread that drives the protocol. Implementations must tolerate a `stop`
/// without a matching `start` (it is ignored).
pub trait Instrumentation: Send + Sync {
    /// Begin timing `phase`
    fn start(&self, phase: Phase);

    /// Stop timing `phase` and accumulate the interval
    fn stop(&self, phase: Phase);
}

/// RAII guard that stops its phase when dropped
///
/// A `None` sink makes the guard a no-op.
pub struct PhaseScope<'a> {
    sink: Option<&'a dyn Instrumentation>,
    phase: Phase,
}

impl<'a> PhaseScope<'a> {
    /// Start `phase` on `sink` and return the guard
    pub fn enter(sink: Option<&'a dyn Instrumentation>, phase: Phase) -> Self {
        if let Some(sink) = sink {
            sink.start(phase);
        }
        Self { sink, phase }
    }

    /// The phase this guard is timing
    pub fn phase(&self) -> Phase {
        self.phase
    }
}

impl Drop for PhaseScope<'_> {
    fn drop(&mut self) {
        if let Some(sink) = self.sink {
            sink.stop(self.phase);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TimerState {
    running_since: Option<Instant>,
    total: Duration,
    calls: usize,
}

/// Accumulating wall-clock timer per [`Phase`]
#[derive(Debug, Default)]
pub struct PhaseTimers {
    table: Mutex<[TimerState; Phase::COUNT]>,
}

impl PhaseTimers {
    /// Create a table with every timer at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated time for `phase`
    pub fn elapsed(&self, phase: Phase) -> Duration {
        self.table.lock()[phase.slot()].total
    }

    /// Accumulated time for `phase` in seconds
    pub fn seconds(&self, phase: Phase) -> f64 {
        self.elapsed(phase).as_secs_f64()
    }

    /// Number of completed intervals for `phase`
    pub fn call_count(&self, phase: Phase) -> usize {
        self.table.lock()[phase.slot()].calls
    }

    /// Add an externally measured interval
    pub fn record(&self, phase: Phase, duration: Duration) {
        let mut table = self.table.lock();
        let state = &mut table[phase.slot()];
        state.total += duration;
        state.calls += 1;
    }

    /// Sum of the communication components of [`Phase::Mpi`]
    pub fn mpi_total_seconds(&self) -> f64 {
        let table = self.table.lock();
        Phase::MPI_COMPONENTS
            .iter()
            .map(|p| table[p.slot()].total.as_secs_f64())
            .sum()
    }

    /// Zero every timer and drop any running interval
    pub fn reset(&self) {
        *self.table.lock() = [TimerState::default(); Phase::COUNT];
    }
}

impl Instrumentation for PhaseTimers {
    fn start(&self, phase: Phase) {
        self.table.lock()[phase.slot()].running_since = Some(Instant::now());
    }

    fn stop(&self, phase: Phase) {
        let mut table = self.table.lock();
        let state = &mut table[phase.slot()];
        if let Some(since) = state.running_since.take() {
            state.total += since.elapsed();
            state.calls += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_scope_records_interval() {
        let timers = PhaseTimers::new();

        {
            let _scope = PhaseScope::enter(Some(&timers), Phase::MpiUpdate);
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(timers.call_count(Phase::MpiUpdate), 1);
        assert!(timers.elapsed(Phase::MpiUpdate) >= Duration::from_millis(5));
        assert_eq!(timers.call_count(Phase::MpiComm), 0);
    }

    #[test]
    fn test_scope_without_sink() {
        let scope = PhaseScope::enter(None, Phase::MpiIdle);
        assert_eq!(scope.phase(), Phase::MpiIdle);
    }

    #[test]
    fn test_stop_without_start_is_ignored() {
        let timers = PhaseTimers::new();
        timers.stop(Phase::Mttkrp);
        assert_eq!(timers.call_count(Phase::Mttkrp), 0);
        assert_eq!(timers.elapsed(Phase::Mttkrp), Duration::ZERO);
    }

    #[test]
    fn test_mpi_total_sums_components() {
        let timers = PhaseTimers::new();
        timers.record(Phase::MpiReduce, Duration::from_millis(250));
        timers.record(Phase::MpiUpdate, Duration::from_millis(500));
        // not a component
        timers.record(Phase::MpiIdle, Duration::from_secs(7));

        assert!((timers.mpi_total_seconds() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let timers = PhaseTimers::new();
        timers.record(Phase::MpiFit, Duration::from_millis(3));
        timers.reset();
        assert_eq!(timers.call_count(Phase::MpiFit), 0);
    }

    #[test]
    fn test_phase_table_order() {
        for (slot, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(phase.slot(), slot);
        }
        assert_eq!(Phase::MpiComm.name(), "mpi_comm");
    }
}
