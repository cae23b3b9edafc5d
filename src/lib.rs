//! Decision-tree guided search over the parameter space of a food-web simulator.
//!
//! Each generation samples parameter vectors, simulates them, labels the
//! outcomes against the median extinction count and trains a classification
//! tree. The favorable leaves of that tree become the hyper-rectangles the next
//! generation samples from.

pub mod config;
pub mod engines;
pub mod error;
pub mod ml;
pub mod simulation;
pub mod types;

pub use engines::regions::{DecisionTree, Region, RegionExtractor, WeightedRegion, WeightedSegment};
pub use engines::sampling::{GeneratorSpec, RegionSampler};
pub use engines::search::{
    GenerationReport, JsonSequenceStore, SearchController, SequenceStatus, SequenceStore,
};
pub use error::{Result, SearchError};
pub use types::{Bounds, ClassLabel, Domain, Feature, InstanceRecord, ParameterVector, StopEvent};
