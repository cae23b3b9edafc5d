//! Per-feature score distributions derived from a trained tree.
//!
//! Two views are offered: [`parameter_distributions`] scores the extent of
//! each leaf, and [`split_distributions`] counts labeled instances between
//! consecutive split thresholds.

use super::intervals::{merge_weighted_segments, WeightedSegment};
use super::region::Region;
use super::tree::{DecisionTree, NodeId, TreeNode};
use crate::error::{Result, SearchError};
use crate::types::{Bounds, ClassLabel, ParameterVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bounds imposed on one feature along a root-to-leaf path. `None` means the
/// path never constrains that side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LeafRange {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl LeafRange {
    /// Fills open ends from `limits`.
    pub fn close(&self, limits: Bounds) -> Bounds {
        Bounds::new(
            self.lower.unwrap_or(limits.lower),
            self.upper.unwrap_or(limits.upper),
        )
    }
}

/// Ranges for every feature split on along the path to `leaf`.
pub fn leaf_ranges(tree: &DecisionTree, leaf: NodeId) -> BTreeMap<String, LeafRange> {
    let parents = tree.parents();
    let mut ranges: BTreeMap<String, LeafRange> = BTreeMap::new();

    let mut node = leaf;
    while let Some(parent) = parents[node.0] {
        if let TreeNode::Internal {
            feature,
            threshold,
            gt,
            ..
        } = tree.node(parent)
        {
            let range = ranges
                .entry(tree.feature_name(*feature).to_string())
                .or_default();
            if node == *gt {
                if range.lower.map_or(true, |low| *threshold > low) {
                    range.lower = Some(*threshold);
                }
            } else if range.upper.map_or(true, |high| *threshold < high) {
                range.upper = Some(*threshold);
            }
        }
        node = parent;
    }

    ranges
}

/// Merged leaf-support segments per feature.
///
/// Each leaf contributes one segment per feature on its path, weighted by the
/// support of its predicted class. Unfavorable leaves contribute negative
/// weight. Open ends are closed with the bounds in `root`.
pub fn parameter_distributions(
    tree: &DecisionTree,
    root: &Region,
) -> Result<BTreeMap<String, Vec<WeightedSegment>>> {
    let mut segments: BTreeMap<String, Vec<WeightedSegment>> = BTreeMap::new();

    for leaf in tree.leaves() {
        let TreeNode::Leaf { class, counts } = tree.node(leaf) else {
            continue;
        };
        let support = counts.get(*class);
        let weight = match class {
            ClassLabel::Favorable => support,
            ClassLabel::Unfavorable => -support,
        };

        for (name, range) in leaf_ranges(tree, leaf) {
            let limits = root
                .get(&name)
                .ok_or_else(|| SearchError::MissingBounds {
                    feature: name.clone(),
                })?;
            let bounds = range.close(limits);
            segments
                .entry(name)
                .or_default()
                .push(WeightedSegment::new(bounds.lower, bounds.upper, weight));
        }
    }

    Ok(segments
        .into_iter()
        .map(|(name, segs)| {
            let merged = merge_weighted_segments(&segs);
            (name, merged)
        })
        .collect())
}

/// Instance tallies for one interval `(low, high]` between split points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalCounts {
    pub low: f64,
    pub high: f64,
    pub favorable: usize,
    pub unfavorable: usize,
    pub unlabeled: usize,
}

impl IntervalCounts {
    pub fn total(&self) -> usize {
        self.favorable + self.unfavorable + self.unlabeled
    }

    /// `P(favorable) - P(unfavorable)` over every instance in the interval.
    pub fn score(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => (self.favorable as f64 - self.unfavorable as f64) / total as f64,
        }
    }
}

/// Counts instances per feature in each interval delimited by the tree's split
/// thresholds, with `root` bounds as the outermost points.
///
/// An instance belongs to the interval where `low < x <= high`, so values
/// equal to the root's lower bound are not counted.
pub fn split_distributions<'a, I>(
    tree: &DecisionTree,
    instances: I,
    root: &Region,
) -> Result<BTreeMap<String, Vec<IntervalCounts>>>
where
    I: IntoIterator<Item = (&'a ParameterVector, Option<ClassLabel>)>,
{
    let mut splits: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for id in tree.internal_nodes() {
        if let TreeNode::Internal {
            feature, threshold, ..
        } = tree.node(id)
        {
            splits
                .entry(tree.feature_name(*feature).to_string())
                .or_default()
                .push(*threshold);
        }
    }

    let instances: Vec<_> = instances.into_iter().collect();
    let mut distributions = BTreeMap::new();

    for (name, mut points) in splits {
        let limits = root
            .get(&name)
            .ok_or_else(|| SearchError::MissingBounds {
                feature: name.clone(),
            })?;
        points.sort_by(f64::total_cmp);
        points.dedup();
        points.insert(0, limits.lower);
        points.push(limits.upper);

        let intervals = points
            .windows(2)
            .map(|pair| {
                let (low, high) = (pair[0], pair[1]);
                let mut counts = IntervalCounts {
                    low,
                    high,
                    favorable: 0,
                    unfavorable: 0,
                    unlabeled: 0,
                };
                for (vector, label) in &instances {
                    let Some(value) = vector.get(&name) else {
                        continue;
                    };
                    if value > low && value <= high {
                        match label {
                            Some(ClassLabel::Favorable) => counts.favorable += 1,
                            Some(ClassLabel::Unfavorable) => counts.unfavorable += 1,
                            None => counts.unlabeled += 1,
                        }
                    }
                }
                counts
            })
            .collect();

        distributions.insert(name, intervals);
    }

    Ok(distributions)
}

/// Converts interval tallies into `(low, high, score)` segments.
pub fn range_weights(
    distributions: &BTreeMap<String, Vec<IntervalCounts>>,
) -> BTreeMap<String, Vec<WeightedSegment>> {
    distributions
        .iter()
        .map(|(name, intervals)| {
            let weighted = intervals
                .iter()
                .map(|c| WeightedSegment::new(c.low, c.high, c.score()))
                .collect();
            (name.clone(), weighted)
        })
        .collect()
}
