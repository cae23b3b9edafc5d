use super::{
    search::SearchConfig, simulation::SimulationConfig, storage::StorageConfig,
    traits::ConfigSection,
};
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Prefix for environment overrides, e.g. `ATN_SEARCH__BATCH_SIZE=500`.
pub const ENV_PREFIX: &str = "ATN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub simulation: SimulationConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.simulation.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Loads a TOML file, then applies `ATN_`-prefixed environment overrides.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SearchError::Configuration(format!(
                "Config file {} not found",
                path.display()
            )));
        }

        let source = ::config::File::from(path).format(::config::FileFormat::Toml);
        self.load(source)
    }

    pub fn load_from_str(&self, contents: &str) -> Result<()> {
        let source = ::config::File::from_str(contents, ::config::FileFormat::Toml);
        self.load(source)
    }

    fn load<S>(&self, source: S) -> Result<()>
    where
        S: ::config::Source + Send + Sync + 'static,
    {
        let settings = ::config::Config::builder()
            .add_source(source)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        log::info!(
            "Loaded configuration: batch size {}, {} simulation threads, data home {}",
            config.search.batch_size,
            config.simulation.threads,
            config.storage.data_home.display()
        );

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| SearchError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| SearchError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `f` and keeps the result only if it validates.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = config.clone();
        f(&mut updated);
        updated.validate()?;
        *config = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MedianPolicy, WeightingPolicy};

    #[test]
    fn test_defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let manager = ConfigManager::new();
        manager
            .load_from_str(
                r#"
                [search]
                batch_size = 200
                median_policy = "per-generation"
                weighting = "leaf-support"
                seed = 42
                "#,
            )
            .unwrap();

        let config = manager.get();
        assert_eq!(config.search.batch_size, 200);
        assert_eq!(config.search.seed, Some(42));
        assert_eq!(config.search.median_policy, MedianPolicy::PerGeneration);
        assert_eq!(config.search.weighting, WeightingPolicy::LeafSupport);
        assert_eq!(config.search.min_leaf_fraction, 0.01);
        assert_eq!(config.simulation.timesteps, 100_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let manager = ConfigManager::new();
        let err = manager
            .load_from_str("[search]\nmin_leaf_fraction = 0.0\n")
            .unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
        assert!(err.to_string().contains("search.min_leaf_fraction must be in (0, 0.5]"));
        let err = manager.load_from_str("[simulation]\nthreads = 0\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: simulation.threads must be at least 1"
        );
        // Failed loads leave the previous config in place
        assert_eq!(manager.get(), AppConfig::default());
    }

    #[test]
    fn test_update_rolls_back_invalid_change() {
        let manager = ConfigManager::new();
        assert!(manager.update(|c| c.search.batch_size = 1).is_err());
        assert_eq!(manager.get().search.batch_size, 1000);
        manager.update(|c| c.search.batch_size = 50).unwrap();
        assert_eq!(manager.get().search.batch_size, 50);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("atnsearch-config-{}.toml", std::process::id()));
        let manager = ConfigManager::new();
        manager.update(|c| c.search.max_depth = Some(6)).unwrap();
        manager.save_to_file(&path).unwrap();

        let reloaded = ConfigManager::new();
        reloaded.load_from_file(&path).unwrap();
        assert_eq!(reloaded.get().search.max_depth, Some(6));
        std::fs::remove_file(&path).ok();

        assert!(ConfigManager::new().load_from_file(&path).is_err());
    }
}
