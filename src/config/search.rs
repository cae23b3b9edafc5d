use super::traits::ConfigSection;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Instances simulated per batch
    pub batch_size: usize,
    /// Minimum leaf size as a fraction of the training set
    pub min_leaf_fraction: f64,
    pub max_depth: Option<usize>,
    /// Seed for generation 0; drawn from entropy when unset
    pub seed: Option<u64>,
    pub median_policy: MedianPolicy,
    pub weighting: WeightingPolicy,
    /// Simulate a held-out test batch each generation
    pub evaluate_on_test_batch: bool,
}

/// Which extinction-count median labels later generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MedianPolicy {
    /// Generation 0's median is reused so labels stay comparable
    Carried,
    PerGeneration,
}

/// Weight given to each favorable region when building the next generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightingPolicy {
    Uniform,
    /// Favorable support at the leaf
    LeafSupport,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            min_leaf_fraction: 0.01,
            max_depth: None,
            seed: None,
            median_policy: MedianPolicy::Carried,
            weighting: WeightingPolicy::Uniform,
            evaluate_on_test_batch: true,
        }
    }
}

impl ConfigSection for SearchConfig {
    fn section_name() -> &'static str {
        "search"
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size < 2 {
            return Err(Self::invalid("batch_size", "must be at least 2"));
        }
        if !(self.min_leaf_fraction > 0.0 && self.min_leaf_fraction <= 0.5) {
            return Err(Self::invalid(
                "min_leaf_fraction",
                format!("must be in (0, 0.5], got {}", self.min_leaf_fraction),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(Self::invalid("max_depth", "must be at least 1 when set"));
        }
        Ok(())
    }
}
