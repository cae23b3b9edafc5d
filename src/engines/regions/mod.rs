pub mod distributions;
pub mod extractor;
pub mod intervals;
pub mod region;
pub mod tree;

pub use distributions::{
    leaf_ranges, parameter_distributions, range_weights, split_distributions, IntervalCounts,
    LeafRange,
};
pub use extractor::{
    favorable_leaves, leaves_where, node_regions, ExtractedRegions, LeafRegion, NodeRegions,
    RegionExtractor,
};
pub use intervals::{merge_weighted_segments, weight_at, WeightedSegment};
pub use region::{Region, WeightedRegion};
pub use tree::{ClassCounts, DecisionTree, NodeId, TreeNode};
