use crate::engines::regions::{Region, WeightedRegion};
use crate::error::{Result, SearchError};
use crate::types::{Bounds, Domain, ParameterVector};
use rand::Rng;

/// Draws parameter vectors from a weighted set of hyper-rectangles.
///
/// Each region is resolved against the domain once at construction: features
/// a region does not constrain take the domain bounds, and constrained features
/// are clipped to the domain.
#[derive(Debug, Clone)]
pub struct RegionSampler {
    feature_names: Vec<String>,
    weights: Vec<f64>,
    resolved: Vec<Vec<Bounds>>,
}

impl RegionSampler {
    pub fn new(domain: &Domain, regions: &[WeightedRegion]) -> Result<Self> {
        if regions.is_empty() {
            return Err(SearchError::Configuration(
                "Region sampler needs at least one region".to_string(),
            ));
        }

        let mut weights = Vec::with_capacity(regions.len());
        let mut resolved = Vec::with_capacity(regions.len());

        for (i, weighted) in regions.iter().enumerate() {
            if !weighted.weight.is_finite() || weighted.weight < 0.0 {
                return Err(SearchError::Configuration(format!(
                    "Region {} has invalid weight {}",
                    i, weighted.weight
                )));
            }
            weights.push(weighted.weight);
            resolved.push(resolve(domain, &weighted.region, i)?);
        }

        Ok(Self {
            feature_names: domain.feature_names(),
            weights,
            resolved,
        })
    }

    /// Sampler over the whole domain.
    pub fn uniform(domain: &Domain) -> Result<Self> {
        Self::new(domain, &[WeightedRegion::new(Region::from_domain(domain), 1.0)])
    }

    pub fn region_count(&self) -> usize {
        self.resolved.len()
    }

    /// Effective bounds of region `index`, ordered like the domain's features.
    pub fn region_bounds(&self, index: usize) -> &[Bounds] {
        &self.resolved[index]
    }

    pub fn sample<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<ParameterVector> {
        (0..count).map(|_| self.sample_one(rng).1).collect()
    }

    /// One draw, returned with the index of the region it came from.
    pub fn sample_one<R: Rng>(&self, rng: &mut R) -> (usize, ParameterVector) {
        let index = self.choose_region(rng);
        let vector = self
            .feature_names
            .iter()
            .zip(&self.resolved[index])
            .map(|(name, bounds)| (name.clone(), draw(bounds, rng)))
            .collect();
        (index, vector)
    }

    /// Roulette wheel over region weights; uniform when every weight is zero.
    pub fn choose_region<R: Rng>(&self, rng: &mut R) -> usize {
        let total: f64 = self.weights.iter().sum();

        if total <= 0.0 {
            return rng.gen_range(0..self.weights.len());
        }

        let mut spin = rng.gen::<f64>() * total;

        for (i, weight) in self.weights.iter().enumerate() {
            if *weight <= 0.0 {
                continue;
            }
            spin -= weight;
            if spin < 0.0 {
                return i;
            }
        }

        // Rounding can leave a sliver at the top of the wheel
        self.weights
            .iter()
            .rposition(|w| *w > 0.0)
            .unwrap_or(self.weights.len() - 1)
    }
}

fn resolve(domain: &Domain, region: &Region, index: usize) -> Result<Vec<Bounds>> {
    for (name, _) in region.iter() {
        if domain.index_of(name).is_none() {
            return Err(SearchError::Configuration(format!(
                "Region {} constrains unknown feature '{}'",
                index, name
            )));
        }
    }

    domain
        .features()
        .iter()
        .map(|feature| match region.get(&feature.name) {
            None => Ok(feature.bounds),
            Some(bounds) if !bounds.is_valid() => Err(SearchError::Configuration(format!(
                "Region {} has invalid bounds [{}, {}] for '{}'",
                index, bounds.lower, bounds.upper, feature.name
            ))),
            Some(bounds) => bounds.intersect(&feature.bounds).ok_or_else(|| {
                SearchError::Configuration(format!(
                    "Region {} lies outside the domain on '{}'",
                    index, feature.name
                ))
            }),
        })
        .collect()
}

fn draw<R: Rng>(bounds: &Bounds, rng: &mut R) -> f64 {
    if bounds.lower == bounds.upper {
        bounds.lower
    } else {
        rng.gen_range(bounds.lower..=bounds.upper)
    }
}
