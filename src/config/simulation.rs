use super::traits::ConfigSection;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Upper bound on concurrent simulations
    pub threads: usize,
    pub timesteps: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timesteps: 100_000,
        }
    }
}

impl ConfigSection for SimulationConfig {
    fn section_name() -> &'static str {
        "simulation"
    }

    fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Self::invalid("threads", "must be at least 1"));
        }
        if self.timesteps == 0 {
            return Err(Self::invalid("timesteps", "must be positive"));
        }
        Ok(())
    }
}
