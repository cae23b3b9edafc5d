use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<()>;

    /// Configuration error naming the offending key, e.g. `search.batch_size`.
    fn invalid(field: &str, reason: impl Display) -> SearchError {
        SearchError::Configuration(format!("{}.{} {}", Self::section_name(), field, reason))
    }
}
