use crate::engines::regions::ClassCounts;
use crate::error::{Result, SearchError};
use crate::types::{ClassLabel, FeatureName, InstanceRecord, ParameterVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledInstance {
    pub parameters: ParameterVector,
    pub extinction_count: u32,
    pub label: ClassLabel,
}

/// Instances per class, unweighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassTally {
    pub unfavorable: usize,
    pub favorable: usize,
}

impl ClassTally {
    pub fn total(&self) -> usize {
        self.unfavorable + self.favorable
    }

    pub fn get(&self, label: ClassLabel) -> usize {
        match label {
            ClassLabel::Unfavorable => self.unfavorable,
            ClassLabel::Favorable => self.favorable,
        }
    }
}

impl From<ClassTally> for ClassCounts {
    fn from(tally: ClassTally) -> Self {
        ClassCounts::new(tally.unfavorable as f64, tally.favorable as f64)
    }
}

/// A simulated batch after filtering and labeling.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledBatch {
    pub instances: Vec<LabeledInstance>,
    /// Threshold used for labeling
    pub median: f64,
    /// Records dropped because their run never reached a steady state
    pub filtered: usize,
}

impl LabeledBatch {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn class_tally(&self) -> ClassTally {
        let mut tally = ClassTally::default();
        for instance in &self.instances {
            match instance.label {
                ClassLabel::Favorable => tally.favorable += 1,
                ClassLabel::Unfavorable => tally.unfavorable += 1,
            }
        }
        tally
    }

    pub fn labels(&self) -> Vec<ClassLabel> {
        self.instances.iter().map(|i| i.label).collect()
    }

    /// One row per instance, columns ordered like `feature_names`.
    pub fn feature_rows(&self, feature_names: &[String]) -> Result<Vec<Vec<f64>>> {
        self.instances
            .iter()
            .map(|i| i.parameters.feature_row(feature_names))
            .collect()
    }

    pub fn extinction_frequencies(&self) -> BTreeMap<u32, f64> {
        extinction_frequencies(self.instances.iter().map(|i| i.extinction_count))
    }

    /// Training needs both classes present.
    pub fn ensure_both_classes(&self) -> Result<()> {
        let tally = self.class_tally();
        if tally.favorable == 0 || tally.unfavorable == 0 {
            return Err(SearchError::Data(format!(
                "Batch has {} favorable and {} unfavorable instances; both classes are required",
                tally.favorable, tally.unfavorable
            )));
        }
        Ok(())
    }

    /// Concatenation of two batches labeled against the same median.
    pub fn combined(&self, other: &LabeledBatch) -> LabeledBatch {
        let mut instances = self.instances.clone();
        instances.extend(other.instances.iter().cloned());
        LabeledBatch {
            instances,
            median: self.median,
            filtered: self.filtered + other.filtered,
        }
    }
}

/// Median extinction count; the mean of the two middle values for even sizes.
pub fn median_extinction_count(counts: &[u32]) -> Option<f64> {
    if counts.is_empty() {
        return None;
    }
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    } else {
        Some(sorted[mid] as f64)
    }
}

/// Drops inconclusive runs and labels the rest: favorable iff the extinction
/// count is strictly below the median. `median` is computed from the batch
/// when not supplied.
pub fn label_batch(records: &[InstanceRecord], median: Option<f64>) -> Result<LabeledBatch> {
    let conclusive: Vec<&InstanceRecord> = records
        .iter()
        .filter(|r| r.stop_event.is_conclusive())
        .collect();
    let filtered = records.len() - conclusive.len();

    if filtered > 0 {
        log::warn!(
            "Filtered {} of {} instances that did not reach a steady state",
            filtered,
            records.len()
        );
    }

    let median = match median {
        Some(m) => m,
        None => {
            let counts: Vec<u32> = conclusive.iter().map(|r| r.extinction_count).collect();
            median_extinction_count(&counts).ok_or_else(|| {
                SearchError::Data("No conclusive instances in batch to label".to_string())
            })?
        }
    };

    let instances = conclusive
        .into_iter()
        .map(|r| LabeledInstance {
            parameters: r.parameters.clone(),
            extinction_count: r.extinction_count,
            label: if (r.extinction_count as f64) < median {
                ClassLabel::Favorable
            } else {
                ClassLabel::Unfavorable
            },
        })
        .collect();

    Ok(LabeledBatch {
        instances,
        median,
        filtered,
    })
}

/// Relative frequency of each extinction count.
pub fn extinction_frequencies<I>(counts: I) -> BTreeMap<u32, f64>
where
    I: IntoIterator<Item = u32>,
{
    let mut tallies: BTreeMap<u32, usize> = BTreeMap::new();
    let mut total = 0usize;
    for count in counts {
        *tallies.entry(count).or_default() += 1;
        total += 1;
    }
    tallies
        .into_iter()
        .map(|(count, n)| (count, n as f64 / total as f64))
        .collect()
}

/// Columns usable as classifier predictors: parameter features of a
/// searchable kind. Bookkeeping columns are dropped.
pub fn predictor_columns(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|name| {
            FeatureName::parse(name)
                .map(|f| f.kind.is_searchable())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StopEvent;

    fn record(x: f64, extinctions: u32, event: StopEvent) -> InstanceRecord {
        InstanceRecord {
            parameters: vec![("X1".to_string(), x)].into_iter().collect(),
            extinction_count: extinctions,
            stop_event: event,
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median_extinction_count(&[]), None);
        assert_eq!(median_extinction_count(&[3, 1, 2]), Some(2.0));
        assert_eq!(median_extinction_count(&[4, 1, 2, 3]), Some(2.5));
    }

    #[test]
    fn test_label_batch_filters_and_labels() {
        let records = vec![
            record(0.1, 1, StopEvent::ConstantBiomass),
            record(0.2, 2, StopEvent::TotalExtinction),
            record(0.3, 3, StopEvent::OscillatingSteadyState),
            record(0.4, 0, StopEvent::None),
            record(0.5, 0, StopEvent::UnknownEvent),
        ];
        let batch = label_batch(&records, None).unwrap();
        assert_eq!(batch.filtered, 2);
        assert_eq!(batch.median, 2.0);
        assert_eq!(
            batch.labels(),
            vec![ClassLabel::Favorable, ClassLabel::Unfavorable, ClassLabel::Unfavorable]
        );
        assert_eq!(batch.class_tally(), ClassTally { unfavorable: 2, favorable: 1 });
        assert!(batch.ensure_both_classes().is_ok());
    }

    #[test]
    fn test_supplied_median_is_used() {
        let records = vec![
            record(0.1, 5, StopEvent::ConstantBiomass),
            record(0.2, 6, StopEvent::ConstantBiomass),
        ];
        let batch = label_batch(&records, Some(10.0)).unwrap();
        assert_eq!(batch.median, 10.0);
        assert_eq!(batch.class_tally().favorable, 2);
        assert!(matches!(batch.ensure_both_classes(), Err(SearchError::Data(_))));
    }

    #[test]
    fn test_all_equal_counts_gives_one_class() {
        let records = vec![
            record(0.1, 2, StopEvent::ConstantBiomass),
            record(0.2, 2, StopEvent::ConstantBiomass),
        ];
        let batch = label_batch(&records, None).unwrap();
        assert_eq!(batch.class_tally().unfavorable, 2);
        assert!(batch.ensure_both_classes().is_err());
    }

    #[test]
    fn test_nothing_conclusive_is_data_error() {
        let records = vec![record(0.1, 2, StopEvent::None)];
        assert!(matches!(label_batch(&records, None), Err(SearchError::Data(_))));
    }

    #[test]
    fn test_frequencies_and_predictors() {
        let freqs = extinction_frequencies([0, 0, 1, 3]);
        assert_eq!(freqs[&0], 0.5);
        assert_eq!(freqs[&3], 0.25);

        let columns: Vec<String> = ["K1", "R1", "X1", "initialBiomass1", "extinction_count", "batch"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(predictor_columns(&columns), vec!["K1", "X1", "initialBiomass1"]);
    }
}
