pub mod generator;
pub mod sampler;

pub use generator::GeneratorSpec;
pub use sampler::RegionSampler;
