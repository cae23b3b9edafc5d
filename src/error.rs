use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing domain bounds for feature '{feature}'")]
    MissingBounds { feature: String },

    #[error("Malformed decision tree at node {node}: {reason}")]
    MalformedTree { node: usize, reason: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Sequence {sequence} produced no favorable regions at generation {generation}")]
    EmptyResult { sequence: u64, generation: usize },

    #[error("Sequence {sequence} has been stopped")]
    SequenceStopped { sequence: u64 },

    #[error("Simulation batch cancelled")]
    Cancelled,

    #[error("Simulation failed: {0}")]
    Simulation(#[from] anyhow::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// Coarse classification of [`SearchError`] used to decide how a caller reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Data,
    EmptyResult,
    Stopped,
    Cancelled,
    Simulation,
    Persistence,
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Configuration(_)
            | SearchError::MissingBounds { .. }
            | SearchError::MalformedTree { .. }
            | SearchError::Config(_) => ErrorKind::Configuration,
            SearchError::Data(_) => ErrorKind::Data,
            SearchError::EmptyResult { .. } => ErrorKind::EmptyResult,
            SearchError::SequenceStopped { .. } => ErrorKind::Stopped,
            SearchError::Cancelled => ErrorKind::Cancelled,
            SearchError::Simulation(_) => ErrorKind::Simulation,
            SearchError::Persistence(_) | SearchError::Io(_) | SearchError::Serde(_) => {
                ErrorKind::Persistence
            }
        }
    }

    /// Whether the failed iteration left persisted state untouched, so it can
    /// be run again once the cause is dealt with.
    ///
    /// A data failure from a deterministic simulator repeats on every re-run
    /// until the simulator or configuration changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Data | ErrorKind::Cancelled | ErrorKind::Simulation
        )
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = SearchError::MissingBounds { feature: "X3".to_string() };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.is_retryable());

        let err = SearchError::Data("only one class".to_string());
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.is_retryable());

        let err = SearchError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(!err.is_retryable());

        assert!(SearchError::Cancelled.is_retryable());
        assert_eq!(
            SearchError::EmptyResult { sequence: 1, generation: 2 }.kind(),
            ErrorKind::EmptyResult
        );
    }

    #[test]
    fn test_display_messages() {
        let err = SearchError::MalformedTree { node: 4, reason: "one child".to_string() };
        assert_eq!(err.to_string(), "Malformed decision tree at node 4: one child");
    }
}
