use super::region::Region;
use super::tree::{ClassCounts, DecisionTree, NodeId, TreeNode};
use crate::error::{Result, SearchError};
use crate::types::{Bounds, ClassLabel};

/// Region of parameter space reaching each node, indexed by [`NodeId`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRegions {
    regions: Vec<Region>,
}

impl NodeRegions {
    pub fn get(&self, id: NodeId) -> &Region {
        &self.regions[id.0]
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Region)> {
        self.regions.iter().enumerate().map(|(i, r)| (NodeId(i), r))
    }
}

/// A selected leaf together with its region and class support.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafRegion {
    pub node: NodeId,
    pub region: Region,
    pub counts: ClassCounts,
}

#[derive(Debug, Clone)]
pub struct ExtractedRegions {
    pub node_regions: NodeRegions,
    pub favorable: Vec<LeafRegion>,
}

/// Turns a trained tree into hyper-rectangles by propagating bounds from the root.
pub struct RegionExtractor {
    positive: ClassLabel,
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self::new(ClassLabel::Favorable)
    }
}

impl RegionExtractor {
    pub fn new(positive: ClassLabel) -> Self {
        Self { positive }
    }

    pub fn positive_class(&self) -> ClassLabel {
        self.positive
    }

    pub fn extract(&self, tree: &DecisionTree, root: &Region) -> Result<ExtractedRegions> {
        let node_regions = node_regions(tree, root)?;
        let favorable = favorable_leaves(tree, self.positive)
            .into_iter()
            .map(|id| LeafRegion {
                node: id,
                region: node_regions.get(id).clone(),
                counts: leaf_counts(tree, id),
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Extracted {} node regions, {} leaves predict {:?}",
            node_regions.len(),
            favorable.len(),
            self.positive
        );

        Ok(ExtractedRegions {
            node_regions,
            favorable,
        })
    }
}

/// Computes the region for every node, starting from `root` at the tree root.
///
/// The "≤" child of a split on `f` at `t` gets `upper = min(upper, t)`, the ">"
/// child gets `lower = max(lower, t)`. Thresholds are clamped into the parent's
/// interval so a child never inverts its bounds.
pub fn node_regions(tree: &DecisionTree, root: &Region) -> Result<NodeRegions> {
    if !root.is_valid() {
        return Err(SearchError::Configuration(
            "Root region has inverted or non-finite bounds".to_string(),
        ));
    }

    for id in tree.internal_nodes() {
        if let TreeNode::Internal { feature, .. } = tree.node(id) {
            let name = tree.feature_name(*feature);
            if root.get(name).is_none() {
                return Err(SearchError::MissingBounds {
                    feature: name.to_string(),
                });
            }
        }
    }

    let mut regions: Vec<Option<Region>> = vec![None; tree.node_count()];
    regions[tree.root().0] = Some(root.clone());
    propagate(tree, tree.root(), &mut regions);

    let regions = regions
        .into_iter()
        .enumerate()
        .map(|(i, region)| {
            region.ok_or_else(|| SearchError::MalformedTree {
                node: i,
                reason: "node unreachable from root".to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NodeRegions { regions })
}

fn propagate(tree: &DecisionTree, id: NodeId, regions: &mut [Option<Region>]) {
    let TreeNode::Internal {
        feature,
        threshold,
        le,
        gt,
    } = tree.node(id)
    else {
        return;
    };

    let Some(parent) = regions[id.0].clone() else {
        return;
    };
    let name = tree.feature_name(*feature);
    let Some(bounds) = parent.get(name) else {
        return;
    };

    let split = threshold.clamp(bounds.lower, bounds.upper);
    if split != *threshold {
        log::debug!(
            "Node {}: threshold {} on {} lies outside [{}, {}]",
            id.0,
            threshold,
            name,
            bounds.lower,
            bounds.upper
        );
    }

    let mut le_region = parent.clone();
    le_region.set(name, Bounds::new(bounds.lower, bounds.upper.min(split)));
    let mut gt_region = parent;
    gt_region.set(name, Bounds::new(bounds.lower.max(split), bounds.upper));

    regions[le.0] = Some(le_region);
    regions[gt.0] = Some(gt_region);

    propagate(tree, *le, regions);
    propagate(tree, *gt, regions);
}

/// Leaves whose predicted class is `positive`.
pub fn favorable_leaves(tree: &DecisionTree, positive: ClassLabel) -> Vec<NodeId> {
    leaves_where(tree, |class, _| class == positive)
}

/// Leaves selected by a caller-supplied rule over predicted class and support.
pub fn leaves_where<F>(tree: &DecisionTree, select: F) -> Vec<NodeId>
where
    F: Fn(ClassLabel, &ClassCounts) -> bool,
{
    tree.leaves()
        .into_iter()
        .filter(|id| match tree.node(*id) {
            TreeNode::Leaf { class, counts } => select(*class, counts),
            TreeNode::Internal { .. } => false,
        })
        .collect()
}

fn leaf_counts(tree: &DecisionTree, id: NodeId) -> ClassCounts {
    match tree.node(id) {
        TreeNode::Leaf { counts, .. } => *counts,
        TreeNode::Internal { .. } => ClassCounts::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Region {
        Region::new()
            .with_bounds("X1", 0.0, 1.0)
            .with_bounds("K1", 1000.0, 15000.0)
    }

    /// X1 <= 0.5 ? (K1 <= 5000 ? unfavorable : favorable) : favorable
    fn tree() -> DecisionTree {
        DecisionTree::new(
            vec!["X1".to_string(), "K1".to_string()],
            vec![
                TreeNode::split(0, 0.5, NodeId(1), NodeId(4)),
                TreeNode::split(1, 5000.0, NodeId(2), NodeId(3)),
                TreeNode::leaf(ClassCounts::new(10.0, 2.0)),
                TreeNode::leaf(ClassCounts::new(1.0, 8.0)),
                TreeNode::leaf(ClassCounts::new(3.0, 20.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_bounds_propagate_to_children() {
        let regions = node_regions(&tree(), &root()).unwrap();
        assert_eq!(regions.get(NodeId(0)), &root());
        assert_eq!(regions.get(NodeId(1)).get("X1"), Some(Bounds::new(0.0, 0.5)));
        assert_eq!(regions.get(NodeId(4)).get("X1"), Some(Bounds::new(0.5, 1.0)));
        assert_eq!(regions.get(NodeId(4)).get("K1"), Some(Bounds::new(1000.0, 15000.0)));
        assert_eq!(regions.get(NodeId(3)).get("K1"), Some(Bounds::new(5000.0, 15000.0)));
        assert_eq!(regions.get(NodeId(3)).get("X1"), Some(Bounds::new(0.0, 0.5)));
    }

    #[test]
    fn test_favorable_leaves_selected() {
        let extracted = RegionExtractor::default().extract(&tree(), &root()).unwrap();
        let nodes: Vec<NodeId> = extracted.favorable.iter().map(|l| l.node).collect();
        assert_eq!(nodes, vec![NodeId(3), NodeId(4)]);
        assert_eq!(extracted.favorable[1].counts, ClassCounts::new(3.0, 20.0));

        let unfavorable = RegionExtractor::new(ClassLabel::Unfavorable)
            .extract(&tree(), &root())
            .unwrap();
        assert_eq!(unfavorable.favorable.len(), 1);
    }

    #[test]
    fn test_custom_leaf_rule() {
        let strong = leaves_where(&tree(), |_, counts| counts.favorable >= 10.0);
        assert_eq!(strong, vec![NodeId(4)]);
    }

    #[test]
    fn test_missing_bounds_is_configuration_error() {
        let partial = Region::new().with_bounds("X1", 0.0, 1.0);
        let err = node_regions(&tree(), &partial).unwrap_err();
        assert!(matches!(err, SearchError::MissingBounds { ref feature } if feature == "K1"));
    }

    #[test]
    fn test_out_of_range_threshold_never_inverts() {
        // Second split on X1 at 0.8 below a parent capped at 0.5
        let tree = DecisionTree::new(
            vec!["X1".to_string()],
            vec![
                TreeNode::split(0, 0.5, NodeId(1), NodeId(4)),
                TreeNode::split(0, 0.8, NodeId(2), NodeId(3)),
                TreeNode::leaf(ClassCounts::new(0.0, 1.0)),
                TreeNode::leaf(ClassCounts::new(0.0, 1.0)),
                TreeNode::leaf(ClassCounts::new(1.0, 0.0)),
            ],
        )
        .unwrap();
        let regions = node_regions(&tree, &Region::new().with_bounds("X1", 0.0, 1.0)).unwrap();
        for (_, region) in regions.iter() {
            assert!(region.is_valid());
        }
        assert_eq!(regions.get(NodeId(3)).get("X1"), Some(Bounds::new(0.5, 0.5)));
    }

    #[test]
    fn test_single_leaf_tree() {
        let tree = DecisionTree::new(
            vec!["X1".to_string()],
            vec![TreeNode::leaf(ClassCounts::new(0.0, 4.0))],
        )
        .unwrap();
        let extracted = RegionExtractor::default()
            .extract(&tree, &Region::new().with_bounds("X1", 0.0, 1.0))
            .unwrap();
        assert_eq!(extracted.favorable.len(), 1);
        assert_eq!(extracted.favorable[0].region.get("X1"), Some(Bounds::new(0.0, 1.0)));
    }
}
