use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Simulator parameters that can be attached to a food-web node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Carrying capacity
    K,
    /// Growth rate
    R,
    /// Metabolic rate
    X,
    #[serde(rename = "initialBiomass")]
    InitialBiomass,
}

impl ParameterKind {
    pub fn all() -> [ParameterKind; 4] {
        [
            ParameterKind::K,
            ParameterKind::R,
            ParameterKind::X,
            ParameterKind::InitialBiomass,
        ]
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            ParameterKind::K => "K",
            ParameterKind::R => "R",
            ParameterKind::X => "X",
            ParameterKind::InitialBiomass => "initialBiomass",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| kind.prefix() == prefix)
    }

    /// Range the simulator accepts for this parameter.
    pub fn valid_range(&self) -> Bounds {
        match self {
            ParameterKind::K => Bounds::new(1000.0, 15000.0),
            ParameterKind::R => Bounds::new(0.0, 3.0),
            ParameterKind::X => Bounds::new(0.0, 1.0),
            ParameterKind::InitialBiomass => Bounds::new(0.0, 15000.0),
        }
    }

    /// Whether columns of this kind are used as classifier predictors.
    pub fn is_searchable(&self) -> bool {
        !matches!(self, ParameterKind::R)
    }
}

/// A feature name split into its parameter and node id, e.g. `X8` or `initialBiomass3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureName {
    pub kind: ParameterKind,
    pub node_id: u32,
}

impl FeatureName {
    pub fn new(kind: ParameterKind, node_id: u32) -> Self {
        Self { kind, node_id }
    }

    pub fn parse(name: &str) -> Result<Self> {
        let split = name
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| SearchError::Configuration(format!("Invalid feature name '{}'", name)))?;
        let (prefix, digits) = name.split_at(split);

        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SearchError::Configuration(format!(
                "Invalid feature name '{}'",
                name
            )));
        }

        let kind = ParameterKind::from_prefix(prefix).ok_or_else(|| {
            SearchError::Configuration(format!("Unknown parameter '{}' in feature '{}'", prefix, name))
        })?;
        let node_id = digits
            .parse::<u32>()
            .map_err(|_| SearchError::Configuration(format!("Invalid feature name '{}'", name)))?;

        Ok(Self { kind, node_id })
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.node_id)
    }
}

/// Closed interval `[lower, upper]` on one feature axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn is_valid(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite() && self.lower <= self.upper
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn is_subset_of(&self, other: &Bounds) -> bool {
        self.lower >= other.lower && self.upper <= other.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn intersect(&self, other: &Bounds) -> Option<Bounds> {
        let bounds = Bounds::new(self.lower.max(other.lower), self.upper.min(other.upper));
        if bounds.lower <= bounds.upper {
            Some(bounds)
        } else {
            None
        }
    }

    /// Smallest interval covering both.
    pub fn envelope(&self, other: &Bounds) -> Bounds {
        Bounds::new(self.lower.min(other.lower), self.upper.max(other.upper))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub bounds: Bounds,
}

impl Feature {
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            bounds: Bounds::new(lower, upper),
        }
    }
}

/// The ordered catalogue of features a search explores, with their domain bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Feature>", into = "Vec<Feature>")]
pub struct Domain {
    features: Vec<Feature>,
}

impl Domain {
    pub fn new(features: Vec<Feature>) -> Result<Self> {
        if features.is_empty() {
            return Err(SearchError::Configuration(
                "Domain must contain at least one feature".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for feature in &features {
            if !seen.insert(feature.name.as_str()) {
                return Err(SearchError::Configuration(format!(
                    "Duplicate feature '{}' in domain",
                    feature.name
                )));
            }
            if !feature.bounds.is_valid() {
                return Err(SearchError::Configuration(format!(
                    "Feature '{}' has invalid bounds [{}, {}]",
                    feature.name, feature.bounds.lower, feature.bounds.upper
                )));
            }
        }

        Ok(Self { features })
    }

    /// Builds the domain for a food web from the simulator's valid parameter ranges.
    pub fn for_nodes(node_ids: &[u32], kinds: &[ParameterKind]) -> Result<Self> {
        let features = node_ids
            .iter()
            .flat_map(|&node_id| {
                kinds.iter().map(move |&kind| {
                    let range = kind.valid_range();
                    Feature::new(FeatureName::new(kind, node_id).to_string(), range.lower, range.upper)
                })
            })
            .collect();
        Self::new(features)
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    pub fn bounds(&self, name: &str) -> Option<Bounds> {
        self.features.iter().find(|f| f.name == name).map(|f| f.bounds)
    }

    /// Every domain feature is present in `vector` and lies within its bounds.
    pub fn contains(&self, vector: &ParameterVector) -> bool {
        self.features.iter().all(|f| {
            vector
                .get(&f.name)
                .map(|value| f.bounds.contains(value))
                .unwrap_or(false)
        })
    }
}

impl TryFrom<Vec<Feature>> for Domain {
    type Error = SearchError;

    fn try_from(features: Vec<Feature>) -> Result<Self> {
        Domain::new(features)
    }
}

impl From<Domain> for Vec<Feature> {
    fn from(domain: Domain) -> Self {
        domain.features
    }
}

/// One candidate simulation input: feature name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterVector {
    values: BTreeMap<String, f64>,
}

impl ParameterVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values for `names` in order, as a classifier input row.
    pub fn feature_row(&self, names: &[String]) -> Result<Vec<f64>> {
        names
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| {
                    SearchError::Data(format!("Instance is missing feature '{}'", name))
                })
            })
            .collect()
    }
}

impl FromIterator<(String, f64)> for ParameterVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Event that ended a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopEvent {
    None,
    UnknownEvent,
    TotalExtinction,
    ConstantBiomass,
    OscillatingSteadyState,
}

impl StopEvent {
    /// Runs that ran out of timesteps or stopped for an unknown reason are not labeled.
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, StopEvent::None | StopEvent::UnknownEvent)
    }
}

/// Binary outcome class assigned to an instance, and predicted by tree leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Unfavorable = 0,
    Favorable = 1,
}

impl ClassLabel {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ClassLabel::Unfavorable),
            1 => Some(ClassLabel::Favorable),
            _ => None,
        }
    }
}

/// One simulated outcome reported by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub parameters: ParameterVector,
    pub extinction_count: u32,
    pub stop_event: StopEvent,
}
