use crate::error::{Result, SearchError};
use crate::types::ClassLabel;
use serde::{Deserialize, Serialize};

/// Index of a node in a [`DecisionTree`] arena. The root is always `NodeId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Per-class instance support at a node. Values may be weighted, so they are not integers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassCounts {
    pub unfavorable: f64,
    pub favorable: f64,
}

impl ClassCounts {
    pub fn new(unfavorable: f64, favorable: f64) -> Self {
        Self { unfavorable, favorable }
    }

    pub fn get(&self, label: ClassLabel) -> f64 {
        match label {
            ClassLabel::Unfavorable => self.unfavorable,
            ClassLabel::Favorable => self.favorable,
        }
    }

    pub fn add(&mut self, label: ClassLabel, amount: f64) {
        match label {
            ClassLabel::Unfavorable => self.unfavorable += amount,
            ClassLabel::Favorable => self.favorable += amount,
        }
    }

    pub fn total(&self) -> f64 {
        self.unfavorable + self.favorable
    }

    /// Favorable only when it strictly outweighs unfavorable.
    pub fn majority(&self) -> ClassLabel {
        if self.favorable > self.unfavorable {
            ClassLabel::Favorable
        } else {
            ClassLabel::Unfavorable
        }
    }

    fn is_valid(&self) -> bool {
        self.unfavorable.is_finite()
            && self.favorable.is_finite()
            && self.unfavorable >= 0.0
            && self.favorable >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Leaf {
        class: ClassLabel,
        counts: ClassCounts,
    },
    Internal {
        /// Index into the tree's feature names
        feature: usize,
        threshold: f64,
        /// Child reached when `value <= threshold`
        le: NodeId,
        /// Child reached when `value > threshold`
        gt: NodeId,
    },
}

impl TreeNode {
    /// Leaf predicting the majority class of `counts`.
    pub fn leaf(counts: ClassCounts) -> Self {
        TreeNode::Leaf {
            class: counts.majority(),
            counts,
        }
    }

    pub fn split(feature: usize, threshold: f64, le: NodeId, gt: NodeId) -> Self {
        TreeNode::Internal {
            feature,
            threshold,
            le,
            gt,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }
}

/// An axis-aligned binary classification tree stored as a node arena.
///
/// Read-only once built: construction validates that every internal node has
/// two in-range children and that the nodes form a single tree rooted at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTree", into = "RawTree")]
pub struct DecisionTree {
    feature_names: Vec<String>,
    nodes: Vec<TreeNode>,
}

#[derive(Serialize, Deserialize)]
struct RawTree {
    feature_names: Vec<String>,
    nodes: Vec<TreeNode>,
}

impl TryFrom<RawTree> for DecisionTree {
    type Error = SearchError;

    fn try_from(raw: RawTree) -> Result<Self> {
        DecisionTree::new(raw.feature_names, raw.nodes)
    }
}

impl From<DecisionTree> for RawTree {
    fn from(tree: DecisionTree) -> Self {
        RawTree {
            feature_names: tree.feature_names,
            nodes: tree.nodes,
        }
    }
}

impl DecisionTree {
    pub fn new(feature_names: Vec<String>, nodes: Vec<TreeNode>) -> Result<Self> {
        let tree = Self {
            feature_names,
            nodes,
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Imports a tree from the index-parallel array layout used by common
    /// training libraries: a child index of `-1` marks a leaf, and
    /// `values[i]` holds `[unfavorable, favorable]` support.
    pub fn from_parallel_arrays(
        feature_names: Vec<String>,
        children_left: &[i64],
        children_right: &[i64],
        features: &[i64],
        thresholds: &[f64],
        values: &[[f64; 2]],
    ) -> Result<Self> {
        let n = children_left.len();
        if [children_right.len(), features.len(), thresholds.len(), values.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err(SearchError::Configuration(
                "Tree arrays must all have the same length".to_string(),
            ));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let node = match (children_left[i], children_right[i]) {
                (-1, -1) => TreeNode::leaf(ClassCounts::new(values[i][0], values[i][1])),
                (-1, _) | (_, -1) => {
                    return Err(SearchError::MalformedTree {
                        node: i,
                        reason: "internal node has exactly one child".to_string(),
                    });
                }
                (left, right) => {
                    let child = |index: i64| {
                        usize::try_from(index).map(NodeId).map_err(|_| SearchError::MalformedTree {
                            node: i,
                            reason: format!("invalid child index {}", index),
                        })
                    };
                    let feature = usize::try_from(features[i]).map_err(|_| {
                        SearchError::MalformedTree {
                            node: i,
                            reason: format!("invalid feature index {}", features[i]),
                        }
                    })?;
                    TreeNode::split(feature, thresholds[i], child(left)?, child(right)?)
                }
            };
            nodes.push(node);
        }

        Self::new(feature_names, nodes)
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(SearchError::MalformedTree {
                node: 0,
                reason: "tree has no nodes".to_string(),
            });
        }

        let mut parent_count = vec![0usize; self.nodes.len()];

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { counts, .. } => {
                    if !counts.is_valid() {
                        return Err(SearchError::MalformedTree {
                            node: i,
                            reason: "leaf has negative or non-finite class counts".to_string(),
                        });
                    }
                }
                TreeNode::Internal {
                    feature,
                    threshold,
                    le,
                    gt,
                } => {
                    if *feature >= self.feature_names.len() {
                        return Err(SearchError::MalformedTree {
                            node: i,
                            reason: format!("feature index {} out of range", feature),
                        });
                    }
                    if !threshold.is_finite() {
                        return Err(SearchError::MalformedTree {
                            node: i,
                            reason: "non-finite threshold".to_string(),
                        });
                    }
                    for child in [le, gt] {
                        if child.0 >= self.nodes.len() || child.0 == 0 {
                            return Err(SearchError::MalformedTree {
                                node: i,
                                reason: format!("child index {} out of range", child.0),
                            });
                        }
                        parent_count[child.0] += 1;
                    }
                }
            }
        }

        if let Some(shared) = parent_count.iter().skip(1).position(|&count| count != 1) {
            return Err(SearchError::MalformedTree {
                node: shared + 1,
                reason: format!("node has {} parents", parent_count[shared + 1]),
            });
        }

        // With one parent per node, a full walk from the root rules out detached cycles
        let mut visited = 0;
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            visited += 1;
            if visited > self.nodes.len() {
                break;
            }
            if let TreeNode::Internal { le, gt, .. } = &self.nodes[id.0] {
                stack.push(*gt);
                stack.push(*le);
            }
        }
        if visited != self.nodes.len() {
            return Err(SearchError::MalformedTree {
                node: 0,
                reason: "nodes are not all reachable from the root".to_string(),
            });
        }

        Ok(())
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_name(&self, index: usize) -> &str {
        &self.feature_names[index]
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.node_ids().filter(|id| self.node(*id).is_leaf()).collect()
    }

    pub fn internal_nodes(&self) -> Vec<NodeId> {
        self.node_ids().filter(|id| !self.node(*id).is_leaf()).collect()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Parent of every node; `None` for the root.
    pub fn parents(&self) -> Vec<Option<NodeId>> {
        let mut parents = vec![None; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Internal { le, gt, .. } = node {
                parents[le.0] = Some(NodeId(i));
                parents[gt.0] = Some(NodeId(i));
            }
        }
        parents
    }

    pub fn depth(&self) -> usize {
        fn walk(tree: &DecisionTree, id: NodeId) -> usize {
            match tree.node(id) {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Internal { le, gt, .. } => 1 + walk(tree, *le).max(walk(tree, *gt)),
            }
        }
        walk(self, self.root())
    }

    /// Leaf reached by `row`, whose values are ordered like [`Self::feature_names`].
    pub fn leaf_for(&self, row: &[f64]) -> Result<NodeId> {
        if row.len() != self.feature_names.len() {
            return Err(SearchError::Data(format!(
                "Row has {} values but tree expects {} features",
                row.len(),
                self.feature_names.len()
            )));
        }

        let mut id = self.root();
        while let TreeNode::Internal {
            feature,
            threshold,
            le,
            gt,
        } = self.node(id)
        {
            id = if row[*feature] <= *threshold { *le } else { *gt };
        }
        Ok(id)
    }

    pub fn predict(&self, row: &[f64]) -> Result<ClassLabel> {
        match self.node(self.leaf_for(row)?) {
            TreeNode::Leaf { class, .. } => Ok(*class),
            TreeNode::Internal { .. } => unreachable!("leaf_for always stops at a leaf"),
        }
    }
}
