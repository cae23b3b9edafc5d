//! Boundary to the external food-web simulator.
//!
//! The search only needs a batch-synchronous [`Simulator`]. Most simulators
//! run one parameter vector at a time, so [`ParallelSimulator`] adapts an
//! [`InstanceSimulator`] into a batch simulator over a bounded thread pool.

mod parallel;

pub use parallel::ParallelSimulator;

use crate::error::Result;
use crate::types::{InstanceRecord, ParameterVector, StopEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Runs a whole batch and returns one record per input vector, in order.
///
/// Implementations must either return the complete batch or an error; a
/// partial batch is never returned. A cancelled batch yields
/// [`crate::error::SearchError::Cancelled`].
pub trait Simulator {
    fn simulate(
        &self,
        batch: &[ParameterVector],
        cancel: &CancellationToken,
    ) -> Result<Vec<InstanceRecord>>;
}

/// Outcome of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationOutcome {
    pub extinction_count: u32,
    pub stop_event: StopEvent,
}

/// Simulates a single parameter vector.
pub trait InstanceSimulator: Send + Sync {
    fn simulate_instance(
        &self,
        parameters: &ParameterVector,
        timesteps: u64,
    ) -> anyhow::Result<SimulationOutcome>;
}

/// Shared flag for cancelling an in-flight batch from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
