use super::state::{ClassCountSummary, SearchState, SequenceState, StopReason};
use crate::engines::regions::WeightedRegion;
use crate::engines::sampling::GeneratorSpec;
use crate::error::{Result, SearchError};
use crate::ml::ClassificationScores;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one completed iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub sequence_id: u64,
    pub generation: usize,
    pub median_extinction_count: f64,
    pub class_counts: ClassCountSummary,
    pub training_scores: ClassificationScores,
    pub test_scores: Option<ClassificationScores>,
    pub extinction_frequencies: BTreeMap<u32, f64>,
    pub tree_node_count: usize,
    pub favorable_regions: Vec<WeightedRegion>,
    /// `None` when the sequence stopped at this generation
    pub next_generator: Option<GeneratorSpec>,
}

impl GenerationReport {
    /// Rebuilds the report for `generation` from persisted state.
    pub fn from_state(state: &SequenceState, generation: usize) -> Result<Self> {
        let record = state
            .generations
            .get(generation)
            .ok_or_else(|| {
                SearchError::Data(format!(
                    "Sequence {} has no generation {}",
                    state.sequence_id, generation
                ))
            })?;
        let outcome = record.outcome.as_ref().ok_or_else(|| {
            SearchError::Data(format!(
                "Generation {} of sequence {} has not been run",
                generation, state.sequence_id
            ))
        })?;

        let next_generator = state
            .generations
            .get(generation + 1)
            .map(|next| next.generator.clone());
        let favorable_regions = next_generator
            .as_ref()
            .map(|spec| spec.regions().to_vec())
            .unwrap_or_default();

        Ok(Self {
            sequence_id: state.sequence_id,
            generation,
            median_extinction_count: outcome.median_extinction_count,
            class_counts: outcome.class_counts,
            training_scores: outcome.training_scores,
            test_scores: outcome.test_scores,
            extinction_frequencies: outcome.extinction_frequencies.clone(),
            tree_node_count: outcome.tree_node_count(),
            favorable_regions,
            next_generator,
        })
    }
}

/// Where a sequence stands, for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStatus {
    pub sequence_id: u64,
    pub state: SearchState,
    pub current_generation: Option<usize>,
    pub completed_generations: usize,
    pub last_favorable_region_count: Option<usize>,
    pub carried_median: Option<f64>,
    pub stopped: Option<StopReason>,
}

impl From<&SequenceState> for SequenceStatus {
    fn from(state: &SequenceState) -> Self {
        Self {
            sequence_id: state.sequence_id,
            state: state.search_state(),
            current_generation: state.current_index(),
            completed_generations: state
                .generations
                .iter()
                .filter(|g| g.outcome.is_some())
                .count(),
            last_favorable_region_count: state
                .last_completed()
                .and_then(|g| g.outcome.as_ref())
                .map(|o| o.favorable_region_count),
            carried_median: state.carried_median,
            stopped: state.stopped,
        }
    }
}
