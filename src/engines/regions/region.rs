use crate::types::{Bounds, Domain, ParameterVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis-aligned hyper-rectangle: one closed interval per constrained feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region {
    bounds: BTreeMap<String, Bounds>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full domain: every feature at its domain bounds.
    pub fn from_domain(domain: &Domain) -> Self {
        domain
            .features()
            .iter()
            .map(|f| (f.name.clone(), f.bounds))
            .collect()
    }

    pub fn with_bounds(mut self, name: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.set(name, Bounds::new(lower, upper));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, bounds: Bounds) {
        self.bounds.insert(name.into(), bounds);
    }

    pub fn get(&self, name: &str) -> Option<Bounds> {
        self.bounds.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Bounds)> {
        self.bounds.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn dimensionality(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.bounds.values().all(Bounds::is_valid)
    }

    /// Every feature `other` constrains is constrained at least as tightly here.
    pub fn is_subset_of(&self, other: &Region) -> bool {
        other.iter().all(|(name, outer)| {
            self.get(name)
                .map(|inner| inner.is_subset_of(&outer))
                .unwrap_or(false)
        })
    }

    pub fn contains(&self, vector: &ParameterVector) -> bool {
        self.iter().all(|(name, bounds)| {
            vector
                .get(name)
                .map(|value| bounds.contains(value))
                .unwrap_or(false)
        })
    }

    /// Per-feature outermost bounds over `regions`.
    pub fn envelope<'a, I>(regions: I) -> Option<Region>
    where
        I: IntoIterator<Item = &'a Region>,
    {
        let mut iter = regions.into_iter();
        let mut envelope = iter.next()?.clone();
        for region in iter {
            for (name, bounds) in region.iter() {
                let merged = match envelope.get(name) {
                    Some(current) => current.envelope(&bounds),
                    None => bounds,
                };
                envelope.set(name, merged);
            }
        }
        Some(envelope)
    }
}

impl FromIterator<(String, Bounds)> for Region {
    fn from_iter<I: IntoIterator<Item = (String, Bounds)>>(iter: I) -> Self {
        Self {
            bounds: iter.into_iter().collect(),
        }
    }
}

/// A region with its relative sampling weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedRegion {
    pub weight: f64,
    pub region: Region,
}

impl WeightedRegion {
    pub fn new(region: Region, weight: f64) -> Self {
        Self { weight, region }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_and_contains() {
        let outer = Region::new().with_bounds("X1", 0.0, 1.0).with_bounds("K1", 1000.0, 15000.0);
        let inner = Region::new().with_bounds("X1", 0.2, 0.4).with_bounds("K1", 1000.0, 2000.0);
        assert!(inner.is_subset_of(&outer));
        assert!(!outer.is_subset_of(&inner));

        // Missing a feature the outer region constrains
        let partial = Region::new().with_bounds("X1", 0.2, 0.4);
        assert!(!partial.is_subset_of(&outer));

        let vector: ParameterVector = vec![("X1".to_string(), 0.3), ("K1".to_string(), 1500.0)]
            .into_iter()
            .collect();
        assert!(inner.contains(&vector));
        assert!(!Region::new().with_bounds("X1", 0.5, 1.0).contains(&vector));
    }

    #[test]
    fn test_envelope() {
        let a = Region::new().with_bounds("X1", 0.1, 0.3).with_bounds("K1", 2000.0, 3000.0);
        let b = Region::new().with_bounds("X1", 0.5, 0.9);
        let envelope = Region::envelope([&a, &b]).unwrap();
        assert_eq!(envelope.get("X1"), Some(Bounds::new(0.1, 0.9)));
        assert_eq!(envelope.get("K1"), Some(Bounds::new(2000.0, 3000.0)));
        assert!(Region::envelope(std::iter::empty::<&Region>()).is_none());
    }
}
