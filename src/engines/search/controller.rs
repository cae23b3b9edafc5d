use super::progress::{BatchKind, ProgressCallback};
use super::report::{GenerationReport, SequenceStatus};
use super::state::{
    ClassCountSummary, GenerationOutcome, GenerationRecord, SearchState, SequenceState, StopReason,
};
use super::store::SequenceStore;
use crate::config::{ConfigSection, MedianPolicy, SearchConfig, WeightingPolicy};
use crate::engines::regions::{DecisionTree, LeafRegion, RegionExtractor, WeightedRegion};
use crate::engines::sampling::GeneratorSpec;
use crate::error::{Result, SearchError};
use crate::ml::{
    label_batch, predictor_columns, score_tree, CartTrainer, ClassificationScores,
    ClassifierTrainer, LabeledBatch, TrainingSet,
};
use crate::simulation::{CancellationToken, Simulator};
use crate::types::{ClassLabel, Domain};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Drives search sequences through simulate, label, train, extract, resample.
///
/// One controller should own a sequence at a time. Nothing is persisted until
/// an iteration has fully succeeded, so a failed or cancelled iteration can
/// simply be re-run.
pub struct SearchController<S, T, St> {
    simulator: S,
    trainer: T,
    store: St,
    config: SearchConfig,
    extractor: RegionExtractor,
    cancel: CancellationToken,
}

impl<S, St> SearchController<S, CartTrainer, St>
where
    S: Simulator,
    St: SequenceStore,
{
    /// Controller whose trees are grown with the configured leaf fraction and depth.
    pub fn from_config(simulator: S, store: St, config: SearchConfig) -> Result<Self> {
        let trainer = CartTrainer::from_config(&config)?;
        Self::new(simulator, trainer, store, config)
    }
}

impl<S, T, St> SearchController<S, T, St>
where
    S: Simulator,
    T: ClassifierTrainer,
    St: SequenceStore,
{
    pub fn new(simulator: S, trainer: T, store: St, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            simulator,
            trainer,
            store,
            config,
            extractor: RegionExtractor::new(ClassLabel::Favorable),
            cancel: CancellationToken::new(),
        })
    }

    /// Token that cancels the batch currently being simulated. It stays
    /// cancelled until [`CancellationToken::reset`] is called.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Creates a sequence whose generation 0 samples the whole domain.
    pub fn start_sequence(&self, domain: Domain) -> Result<u64> {
        let seed = match self.config.seed {
            Some(seed) => seed,
            None => StdRng::from_entropy().gen(),
        };

        let sequence_id = self.store.create_sequence()?;
        let mut state = SequenceState::new(sequence_id, domain);
        state.generations.push(GenerationRecord::new(
            0,
            GeneratorSpec::uniform(self.config.batch_size, seed),
        ));
        self.store.save(&state)?;

        log::info!(
            "Initialized sequence {} over {} features (seed {})",
            sequence_id,
            state.domain.len(),
            seed
        );
        Ok(sequence_id)
    }

    pub fn run_iteration(&self, sequence_id: u64) -> Result<GenerationReport> {
        self.run_iteration_with_progress(sequence_id, &mut ())
    }

    pub fn run_iteration_with_progress<P: ProgressCallback>(
        &self,
        sequence_id: u64,
        progress: &mut P,
    ) -> Result<GenerationReport> {
        let mut state = self.store.load(sequence_id)?;
        if state.stopped.is_some() {
            return Err(SearchError::SequenceStopped {
                sequence: sequence_id,
            });
        }

        let record = match state.current() {
            Some(record) if record.outcome.is_none() => record.clone(),
            _ => {
                return Err(SearchError::Persistence(format!(
                    "Sequence {} has no generation ready to run",
                    sequence_id
                )))
            }
        };
        let generation = record.index;
        let generator = &record.generator;
        let domain = state.domain.clone();

        let predictors = predictor_columns(&domain.feature_names());
        if predictors.is_empty() {
            return Err(SearchError::Configuration(format!(
                "Sequence {} has no searchable features",
                sequence_id
            )));
        }

        log::info!("Sequence {}: starting generation {}", sequence_id, generation);
        progress.on_iteration_start(sequence_id, generation);

        // Training batch
        let carried = match self.config.median_policy {
            MedianPolicy::Carried => state.carried_median,
            MedianPolicy::PerGeneration => None,
        };
        let train = self.simulate_and_label(
            sequence_id,
            generator,
            &domain,
            BatchKind::Training,
            carried,
            progress,
        )?;
        train.ensure_both_classes()?;
        log::info!(
            "Sequence {}: median extinction count {}, class counts {:?}",
            sequence_id,
            train.median,
            train.class_tally()
        );

        let train_set = TrainingSet::from_batch(&train, &predictors)?;
        let train_tree = self.trainer.train(&train_set)?;
        let training_scores = score_tree(&train_tree, &train_set.rows, &train_set.labels)?;
        log::info!(
            "Sequence {}: training confusion {:?}, f1 {:?}",
            sequence_id,
            training_scores.confusion.0,
            training_scores.f1
        );

        // Held-out evaluation, then retrain on everything
        let (test, test_scores, tree, combined) = if self.config.evaluate_on_test_batch {
            let test = self.simulate_and_label(
                sequence_id,
                generator,
                &domain,
                BatchKind::Test,
                Some(train.median),
                progress,
            )?;
            let test_set = TrainingSet::from_batch(&test, &predictors)?;
            let scores = score_tree(&train_tree, &test_set.rows, &test_set.labels)?;
            log::info!(
                "Sequence {}: test confusion {:?}, f1 {:?}",
                sequence_id,
                scores.confusion.0,
                scores.f1
            );

            let combined = train.combined(&test);
            let tree = self
                .trainer
                .train(&TrainingSet::from_batch(&combined, &predictors)?)?;
            (Some(test), Some(scores), tree, combined)
        } else {
            (None, None, train_tree, train.clone())
        };
        log::debug!(
            "Sequence {}: {:?} ({} nodes)",
            sequence_id,
            SearchState::Trained,
            tree.node_count()
        );

        // Root bounds come from this generation's own regions, so regions only tighten
        let root = generator.root_bounds(&domain);
        let extracted = self.extractor.extract(&tree, &root)?;
        log::debug!(
            "Sequence {}: {:?} ({} favorable leaves)",
            sequence_id,
            SearchState::RegionsExtracted,
            extracted.favorable.len()
        );

        let regions = self.weigh(&extracted.favorable);
        let outcome = self.outcome(
            &train,
            test.as_ref(),
            &combined,
            training_scores,
            test_scores,
            tree,
            regions.len(),
        );

        if self.config.median_policy == MedianPolicy::Carried && state.carried_median.is_none() {
            state.carried_median = Some(train.median);
        }
        if let Some(current) = state.generations.last_mut() {
            current.outcome = Some(outcome);
        }

        if regions.is_empty() {
            log::warn!(
                "Sequence {}: generation {} produced no favorable regions; stopping",
                sequence_id,
                generation
            );
            state.stopped = Some(StopReason::NoFavorableRegions);
            self.store.save(&state)?;
            progress.on_iteration_complete(sequence_id, generation, 0);
            return Err(SearchError::EmptyResult {
                sequence: sequence_id,
                generation,
            });
        }

        let region_count = regions.len();
        let next = GeneratorSpec::multi_region(generator.count(), generator.next_seed(), regions);
        state
            .generations
            .push(GenerationRecord::new(generation + 1, next));
        self.store.save(&state)?;

        log::info!(
            "Sequence {}: {:?} to generation {} with {} regions",
            sequence_id,
            SearchState::Advanced,
            generation + 1,
            region_count
        );

        let report = GenerationReport::from_state(&state, generation)?;
        progress.on_iteration_complete(sequence_id, generation, report.favorable_regions.len());
        Ok(report)
    }

    pub fn status(&self, sequence_id: u64) -> Result<SequenceStatus> {
        let state = self.store.load(sequence_id)?;
        Ok(SequenceStatus::from(&state))
    }

    /// Report for an already completed generation.
    pub fn report(&self, sequence_id: u64, generation: usize) -> Result<GenerationReport> {
        let state = self.store.load(sequence_id)?;
        GenerationReport::from_state(&state, generation)
    }

    /// Operator stop. Idempotent; an existing stop reason is kept.
    pub fn stop(&self, sequence_id: u64) -> Result<SequenceStatus> {
        let mut state = self.store.load(sequence_id)?;
        if state.stopped.is_none() {
            state.stopped = Some(StopReason::Operator);
            self.store.save(&state)?;
            log::info!("Sequence {} stopped by operator", sequence_id);
        }
        Ok(SequenceStatus::from(&state))
    }

    pub fn list_sequences(&self) -> Result<Vec<SequenceStatus>> {
        self.store
            .list()?
            .into_iter()
            .map(|id| self.status(id))
            .collect()
    }

    fn simulate_and_label<P: ProgressCallback>(
        &self,
        sequence_id: u64,
        generator: &GeneratorSpec,
        domain: &Domain,
        kind: BatchKind,
        median: Option<f64>,
        progress: &mut P,
    ) -> Result<LabeledBatch> {
        let stream = match kind {
            BatchKind::Training => 0,
            BatchKind::Test => 1,
        };
        let batch = generator.generate(domain, stream)?;
        let records = self.simulator.simulate(&batch, &self.cancel)?;
        if records.len() != batch.len() {
            return Err(SearchError::Data(format!(
                "Simulator returned {} records for {} instances",
                records.len(),
                batch.len()
            )));
        }
        progress.on_batch_simulated(sequence_id, kind, records.len());

        let labeled = label_batch(&records, median)?;
        log::debug!(
            "Sequence {}: {:?} extinction frequencies {:?}",
            sequence_id,
            kind,
            labeled.extinction_frequencies()
        );
        Ok(labeled)
    }

    fn weigh(&self, leaves: &[LeafRegion]) -> Vec<WeightedRegion> {
        leaves
            .iter()
            .map(|leaf| {
                let weight = match self.config.weighting {
                    WeightingPolicy::Uniform => 1.0,
                    WeightingPolicy::LeafSupport => leaf.counts.favorable,
                };
                WeightedRegion::new(leaf.region.clone(), weight)
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn outcome(
        &self,
        train: &LabeledBatch,
        test: Option<&LabeledBatch>,
        combined: &LabeledBatch,
        training_scores: ClassificationScores,
        test_scores: Option<ClassificationScores>,
        tree: DecisionTree,
        favorable_region_count: usize,
    ) -> GenerationOutcome {
        GenerationOutcome {
            median_extinction_count: train.median,
            class_counts: ClassCountSummary {
                train: train.class_tally(),
                test: test.map(LabeledBatch::class_tally),
                combined: combined.class_tally(),
            },
            training_scores,
            test_scores,
            extinction_frequencies: combined.extinction_frequencies(),
            filtered_instances: combined.filtered,
            tree,
            favorable_region_count,
            completed_at: Utc::now(),
        }
    }
}
