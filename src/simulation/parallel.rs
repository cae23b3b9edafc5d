use super::{CancellationToken, InstanceSimulator, Simulator};
use crate::config::{ConfigSection, SimulationConfig};
use crate::error::{Result, SearchError};
use crate::types::{InstanceRecord, ParameterVector};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Fans a batch out over a dedicated rayon pool sized by `threads`.
pub struct ParallelSimulator<S> {
    inner: S,
    pool: ThreadPool,
    timesteps: u64,
}

impl<S: InstanceSimulator> ParallelSimulator<S> {
    pub fn new(inner: S, config: &SimulationConfig) -> Result<Self> {
        config.validate()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("simulate-{}", i))
            .build()
            .map_err(|e| SearchError::Configuration(format!("Failed to build thread pool: {}", e)))?;

        Ok(Self {
            inner,
            pool,
            timesteps: config.timesteps,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl<S: InstanceSimulator> Simulator for ParallelSimulator<S> {
    fn simulate(
        &self,
        batch: &[ParameterVector],
        cancel: &CancellationToken,
    ) -> Result<Vec<InstanceRecord>> {
        log::debug!(
            "Simulating {} instances on {} threads",
            batch.len(),
            self.threads()
        );

        let records = self.pool.install(|| {
            batch
                .par_iter()
                .map(|parameters| {
                    if cancel.is_cancelled() {
                        return Err(SearchError::Cancelled);
                    }
                    let outcome = self.inner.simulate_instance(parameters, self.timesteps)?;
                    Ok(InstanceRecord {
                        parameters: parameters.clone(),
                        extinction_count: outcome.extinction_count,
                        stop_event: outcome.stop_event,
                    })
                })
                .collect::<Result<Vec<_>>>()
        });

        // A cancel that lands after the last instance still discards the batch
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulationOutcome;
    use crate::types::StopEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Threshold;

    impl InstanceSimulator for Threshold {
        fn simulate_instance(
            &self,
            parameters: &ParameterVector,
            _timesteps: u64,
        ) -> anyhow::Result<SimulationOutcome> {
            let x = parameters
                .get("X1")
                .ok_or_else(|| anyhow::anyhow!("missing X1"))?;
            Ok(SimulationOutcome {
                extinction_count: if x < 0.5 { 0 } else { 3 },
                stop_event: StopEvent::ConstantBiomass,
            })
        }
    }

    struct CancelAfter {
        token: CancellationToken,
        calls: AtomicUsize,
    }

    impl InstanceSimulator for CancelAfter {
        fn simulate_instance(&self, _: &ParameterVector, _: u64) -> anyhow::Result<SimulationOutcome> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 2 {
                self.token.cancel();
            }
            Ok(SimulationOutcome {
                extinction_count: 0,
                stop_event: StopEvent::ConstantBiomass,
            })
        }
    }

    fn config(threads: usize) -> SimulationConfig {
        SimulationConfig {
            threads,
            ..SimulationConfig::default()
        }
    }

    fn batch(n: usize) -> Vec<ParameterVector> {
        (0..n)
            .map(|i| vec![("X1".to_string(), i as f64 / n as f64)].into_iter().collect())
            .collect()
    }

    #[test]
    fn test_records_keep_input_order() {
        let sim = ParallelSimulator::new(Threshold, &config(4)).unwrap();
        let input = batch(100);
        let records = sim.simulate(&input, &CancellationToken::new()).unwrap();
        assert_eq!(records.len(), 100);
        for (record, parameters) in records.iter().zip(&input) {
            assert_eq!(&record.parameters, parameters);
        }
        assert_eq!(records[0].extinction_count, 0);
        assert_eq!(records[99].extinction_count, 3);
    }

    #[test]
    fn test_instance_failure_fails_batch() {
        let sim = ParallelSimulator::new(Threshold, &config(2)).unwrap();
        let mut input = batch(10);
        input.push(ParameterVector::new());
        let err = sim.simulate(&input, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, SearchError::Simulation(_)));
    }

    #[test]
    fn test_cancelled_batch_returns_nothing() {
        let token = CancellationToken::new();
        let sim = ParallelSimulator::new(
            CancelAfter {
                token: token.clone(),
                calls: AtomicUsize::new(0),
            },
            &config(1),
        )
        .unwrap();
        let err = sim.simulate(&batch(20), &token).unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(ParallelSimulator::new(Threshold, &config(0)).is_err());
    }
}
