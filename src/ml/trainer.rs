use crate::config::SearchConfig;
use crate::engines::regions::{ClassCounts, DecisionTree, NodeId, TreeNode};
use crate::error::{Result, SearchError};
use crate::ml::labeling::LabeledBatch;
use crate::types::ClassLabel;

/// Feature rows and labels handed to a [`ClassifierTrainer`].
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<ClassLabel>,
}

impl TrainingSet {
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<f64>>, labels: Vec<ClassLabel>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(SearchError::Data(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != feature_names.len()) {
            return Err(SearchError::Data(format!(
                "Row has {} values, expected {}",
                row.len(),
                feature_names.len()
            )));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(SearchError::Data("Training data contains non-finite values".to_string()));
        }
        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    pub fn from_batch(batch: &LabeledBatch, feature_names: &[String]) -> Result<Self> {
        Self::new(
            feature_names.to_vec(),
            batch.feature_rows(feature_names)?,
            batch.labels(),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fits a binary decision tree to labeled rows.
pub trait ClassifierTrainer {
    fn train(&self, data: &TrainingSet) -> Result<DecisionTree>;
}

/// Binary CART with Gini impurity and balanced class weights.
///
/// Split candidates are midpoints between consecutive distinct values. Ties
/// go to the lowest feature index, then the lowest threshold, so training is
/// deterministic.
#[derive(Debug, Clone)]
pub struct CartTrainer {
    min_leaf_fraction: f64,
    max_depth: Option<usize>,
}

impl CartTrainer {
    pub fn new(min_leaf_fraction: f64) -> Result<Self> {
        if !(min_leaf_fraction > 0.0 && min_leaf_fraction <= 0.5) {
            return Err(SearchError::Configuration(format!(
                "min_leaf_fraction must be in (0, 0.5], got {}",
                min_leaf_fraction
            )));
        }
        Ok(Self {
            min_leaf_fraction,
            max_depth: None,
        })
    }

    /// Trainer using the search section's leaf fraction and depth limit.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        Ok(Self::new(config.min_leaf_fraction)?.with_max_depth(config.max_depth))
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn min_leaf_size(&self, n: usize) -> usize {
        ((self.min_leaf_fraction * n as f64).ceil() as usize).max(1)
    }
}

impl ClassifierTrainer for CartTrainer {
    fn train(&self, data: &TrainingSet) -> Result<DecisionTree> {
        if data.is_empty() {
            return Err(SearchError::Data("Cannot train on an empty data set".to_string()));
        }

        let n = data.len();
        let favorable = data.labels.iter().filter(|l| **l == ClassLabel::Favorable).count();
        let class_count = [n - favorable, favorable];
        // Balanced weighting: n / (classes * count)
        let class_weight = class_count.map(|c| if c == 0 { 0.0 } else { n as f64 / (2.0 * c as f64) });

        let builder = Builder {
            data,
            weights: &class_weight,
            min_leaf: self.min_leaf_size(n),
            max_depth: self.max_depth,
            nodes: Vec::new(),
        };
        let nodes = builder.build();

        log::debug!(
            "Trained tree with {} nodes on {} instances (min leaf {})",
            nodes.len(),
            n,
            self.min_leaf_size(n)
        );

        DecisionTree::new(data.feature_names.clone(), nodes)
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Builder<'a> {
    data: &'a TrainingSet,
    weights: &'a [f64; 2],
    min_leaf: usize,
    max_depth: Option<usize>,
    nodes: Vec<TreeNode>,
}

impl<'a> Builder<'a> {
    fn build(mut self) -> Vec<TreeNode> {
        let indices: Vec<usize> = (0..self.data.len()).collect();
        self.grow(indices, 0);
        self.nodes
    }

    fn counts(&self, indices: &[usize]) -> ClassCounts {
        let mut counts = ClassCounts::default();
        for &i in indices {
            let label = self.data.labels[i];
            counts.add(label, self.weights[label.index()]);
        }
        counts
    }

    /// Appends the subtree for `indices` in pre-order and returns its root.
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> NodeId {
        let counts = self.counts(&indices);
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode::leaf(counts));

        let pure = counts.unfavorable == 0.0 || counts.favorable == 0.0;
        let depth_reached = self.max_depth.map_or(false, |max| depth >= max);
        if pure || depth_reached || indices.len() < 2 * self.min_leaf {
            return id;
        }

        let Some(split) = self.best_split(&indices, counts) else {
            return id;
        };

        let (le, gt): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.data.rows[i][split.feature] <= split.threshold);

        log::trace!(
            "Node {}: split feature {} at {} (gain {:.6})",
            id.0,
            split.feature,
            split.threshold,
            split.gain
        );

        let le_id = self.grow(le, depth + 1);
        let gt_id = self.grow(gt, depth + 1);
        self.nodes[id.0] = TreeNode::split(split.feature, split.threshold, le_id, gt_id);
        id
    }

    fn best_split(&self, indices: &[usize], parent: ClassCounts) -> Option<Split> {
        let parent_impurity = gini(&parent) * parent.total();
        let mut best: Option<Split> = None;

        for feature in 0..self.data.feature_names.len() {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                self.data.rows[a][feature]
                    .total_cmp(&self.data.rows[b][feature])
                    .then(a.cmp(&b))
            });

            let mut left = ClassCounts::default();
            for position in 0..sorted.len() - 1 {
                let i = sorted[position];
                let label = self.data.labels[i];
                left.add(label, self.weights[label.index()]);

                let left_size = position + 1;
                let right_size = sorted.len() - left_size;
                if left_size < self.min_leaf || right_size < self.min_leaf {
                    continue;
                }

                let value = self.data.rows[i][feature];
                let next = self.data.rows[sorted[position + 1]][feature];
                if value == next {
                    continue;
                }

                let right = ClassCounts::new(
                    parent.unfavorable - left.unfavorable,
                    parent.favorable - left.favorable,
                );
                let gain = parent_impurity
                    - gini(&left) * left.total()
                    - gini(&right) * right.total();

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain + 1e-12) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}

fn gini(counts: &ClassCounts) -> f64 {
    let total = counts.total();
    if total <= 0.0 {
        return 0.0;
    }
    let p = counts.favorable / total;
    let q = counts.unfavorable / total;
    1.0 - p * p - q * q
}
