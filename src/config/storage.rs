use super::traits::ConfigSection;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory; sequences live under `<data_home>/sequences/`
    pub data_home: PathBuf,
}

impl StorageConfig {
    pub fn sequences_dir(&self) -> PathBuf {
        self.data_home.join("sequences")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_home: PathBuf::from("data"),
        }
    }
}

impl ConfigSection for StorageConfig {
    fn section_name() -> &'static str {
        "storage"
    }

    fn validate(&self) -> Result<()> {
        if self.data_home.as_os_str().is_empty() {
            return Err(Self::invalid("data_home", "must not be empty"));
        }
        Ok(())
    }
}
