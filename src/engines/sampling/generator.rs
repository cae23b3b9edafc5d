use super::sampler::RegionSampler;
use crate::engines::regions::{Region, WeightedRegion};
use crate::error::Result;
use crate::types::{Domain, ParameterVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How a generation's parameter vectors are produced. Persisted with every
/// generation, so a generation can be regenerated exactly from its spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "generator", content = "args", rename_all = "kebab-case")]
pub enum GeneratorSpec {
    /// Uniform over the full domain.
    Uniform { count: usize, seed: u64 },
    /// Weighted draws from a set of regions.
    MultiRegion {
        count: usize,
        seed: u64,
        regions: Vec<WeightedRegion>,
    },
}

impl GeneratorSpec {
    pub fn uniform(count: usize, seed: u64) -> Self {
        GeneratorSpec::Uniform { count, seed }
    }

    pub fn multi_region(count: usize, seed: u64, regions: Vec<WeightedRegion>) -> Self {
        GeneratorSpec::MultiRegion {
            count,
            seed,
            regions,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            GeneratorSpec::Uniform { count, .. } | GeneratorSpec::MultiRegion { count, .. } => *count,
        }
    }

    pub fn seed(&self) -> u64 {
        match self {
            GeneratorSpec::Uniform { seed, .. } | GeneratorSpec::MultiRegion { seed, .. } => *seed,
        }
    }

    /// Regions sampled from; empty for a uniform generator.
    pub fn regions(&self) -> &[WeightedRegion] {
        match self {
            GeneratorSpec::Uniform { .. } => &[],
            GeneratorSpec::MultiRegion { regions, .. } => regions,
        }
    }

    /// Bounds a tree trained on this generator's output starts from.
    ///
    /// Uniform generators start from the domain. Multi-region generators
    /// start from the outermost envelope of their regions, so regions only
    /// tighten from one generation to the next.
    pub fn root_bounds(&self, domain: &Domain) -> Region {
        let mut root = Region::from_domain(domain);
        if let Some(envelope) = Region::envelope(self.regions().iter().map(|r| &r.region)) {
            for (name, bounds) in envelope.iter() {
                if let Some(limits) = domain.bounds(name) {
                    root.set(name, bounds.intersect(&limits).unwrap_or(limits));
                }
            }
        }
        root
    }

    pub fn sampler(&self, domain: &Domain) -> Result<RegionSampler> {
        match self {
            GeneratorSpec::Uniform { .. } => RegionSampler::uniform(domain),
            GeneratorSpec::MultiRegion { regions, .. } => RegionSampler::new(domain, regions),
        }
    }

    /// Draws `count` vectors for batch `stream` (0 = training, 1 = test).
    /// The same spec, domain and stream always produce the same batch.
    pub fn generate(&self, domain: &Domain, stream: u64) -> Result<Vec<ParameterVector>> {
        let sampler = self.sampler(domain)?;
        let mut rng = StdRng::seed_from_u64(self.seed().wrapping_add(stream));
        Ok(sampler.sample(self.count(), &mut rng))
    }

    /// Seed for the generation that follows this one.
    pub fn next_seed(&self) -> u64 {
        StdRng::seed_from_u64(self.seed()).gen()
    }
}
