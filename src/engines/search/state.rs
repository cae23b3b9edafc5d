use crate::engines::regions::DecisionTree;
use crate::engines::sampling::GeneratorSpec;
use crate::ml::{ClassTally, ClassificationScores};
use crate::types::Domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bumped whenever the persisted layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

/// Where a sequence stands in the generation cycle.
///
/// `Trained` and `RegionsExtracted` only exist in memory while an iteration
/// runs; persisted state is always ready, advanced or stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchState {
    Uninitialized,
    GenerationReady,
    Trained,
    RegionsExtracted,
    Advanced,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    Operator,
    NoFavorableRegions,
}

/// Unweighted class counts for each data set used in a generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassCountSummary {
    pub train: ClassTally,
    pub test: Option<ClassTally>,
    pub combined: ClassTally,
}

/// What one completed iteration learned about its generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub median_extinction_count: f64,
    pub class_counts: ClassCountSummary,
    pub training_scores: ClassificationScores,
    pub test_scores: Option<ClassificationScores>,
    /// Relative frequency of each extinction count over the combined data
    pub extinction_frequencies: BTreeMap<u32, f64>,
    /// Instances dropped for never reaching a steady state
    pub filtered_instances: usize,
    pub tree: DecisionTree,
    pub favorable_region_count: usize,
    pub completed_at: DateTime<Utc>,
}

impl GenerationOutcome {
    pub fn tree_node_count(&self) -> usize {
        self.tree.node_count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub index: usize,
    pub generator: GeneratorSpec,
    pub created_at: DateTime<Utc>,
    /// Set once the generation has been simulated and trained on
    pub outcome: Option<GenerationOutcome>,
}

impl GenerationRecord {
    pub fn new(index: usize, generator: GeneratorSpec) -> Self {
        Self {
            index,
            generator,
            created_at: Utc::now(),
            outcome: None,
        }
    }
}

/// Everything persisted for one search sequence.
///
/// Replaced as a whole on every save; generations before the last are never
/// modified once the next one has been appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceState {
    pub schema_version: u32,
    pub sequence_id: u64,
    pub domain: Domain,
    /// Median fixed by generation 0 under the carried policy
    pub carried_median: Option<f64>,
    pub generations: Vec<GenerationRecord>,
    pub stopped: Option<StopReason>,
    pub created_at: DateTime<Utc>,
}

impl SequenceState {
    pub fn new(sequence_id: u64, domain: Domain) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sequence_id,
            domain,
            carried_median: None,
            generations: Vec::new(),
            stopped: None,
            created_at: Utc::now(),
        }
    }

    pub fn current(&self) -> Option<&GenerationRecord> {
        self.generations.last()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current().map(|g| g.index)
    }

    /// The most recent generation that finished training.
    pub fn last_completed(&self) -> Option<&GenerationRecord> {
        self.generations.iter().rev().find(|g| g.outcome.is_some())
    }

    pub fn search_state(&self) -> SearchState {
        if self.stopped.is_some() {
            return SearchState::Stopped;
        }
        match self.current() {
            None => SearchState::Uninitialized,
            Some(record) if record.outcome.is_none() => SearchState::GenerationReady,
            // A completed generation is always followed by a new one unless stopped
            Some(_) => SearchState::Advanced,
        }
    }
}
