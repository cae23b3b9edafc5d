pub mod traits;
pub mod search;
pub mod simulation;
pub mod storage;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use traits::ConfigSection;
pub use search::{MedianPolicy, SearchConfig, WeightingPolicy};
pub use simulation::SimulationConfig;
pub use storage::StorageConfig;
