use crate::engines::regions::DecisionTree;
use crate::error::{Result, SearchError};
use crate::types::ClassLabel;
use serde::{Deserialize, Serialize};

/// 2x2 confusion matrix indexed `[actual][predicted]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix(pub [[usize; 2]; 2]);

impl ConfusionMatrix {
    pub fn from_predictions(actual: &[ClassLabel], predicted: &[ClassLabel]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(SearchError::Data(format!(
                "Got {} predictions for {} labels",
                predicted.len(),
                actual.len()
            )));
        }

        let mut matrix = [[0usize; 2]; 2];
        for (a, p) in actual.iter().zip(predicted) {
            matrix[a.index()][p.index()] += 1;
        }
        Ok(Self(matrix))
    }

    pub fn get(&self, actual: ClassLabel, predicted: ClassLabel) -> usize {
        self.0[actual.index()][predicted.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => (self.0[0][0] + self.0[1][1]) as f64 / total as f64,
        }
    }

    /// F1 treating `label` as the positive class. Zero when undefined.
    pub fn f1(&self, label: ClassLabel) -> f64 {
        let other = match label {
            ClassLabel::Favorable => ClassLabel::Unfavorable,
            ClassLabel::Unfavorable => ClassLabel::Favorable,
        };
        let tp = self.get(label, label) as f64;
        let fp = self.get(other, label) as f64;
        let fn_ = self.get(label, other) as f64;

        let denominator = 2.0 * tp + fp + fn_;
        if denominator == 0.0 {
            0.0
        } else {
            2.0 * tp / denominator
        }
    }
}

/// How well a tree reproduces a labeled batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationScores {
    pub confusion: ConfusionMatrix,
    /// Indexed by [`ClassLabel::index`]
    pub f1: [f64; 2],
    pub accuracy: f64,
}

impl ClassificationScores {
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        Self {
            confusion,
            f1: [
                confusion.f1(ClassLabel::Unfavorable),
                confusion.f1(ClassLabel::Favorable),
            ],
            accuracy: confusion.accuracy(),
        }
    }
}

/// Scores `tree` on `rows` (ordered like the tree's feature names) against `actual`.
pub fn score_tree(
    tree: &DecisionTree,
    rows: &[Vec<f64>],
    actual: &[ClassLabel],
) -> Result<ClassificationScores> {
    let predicted = rows
        .iter()
        .map(|row| tree.predict(row))
        .collect::<Result<Vec<_>>>()?;
    let confusion = ConfusionMatrix::from_predictions(actual, &predicted)?;
    Ok(ClassificationScores::from_confusion(confusion))
}
