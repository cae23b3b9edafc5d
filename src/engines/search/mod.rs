pub mod controller;
pub mod progress;
pub mod report;
pub mod state;
pub mod store;

pub use controller::SearchController;
pub use progress::{BatchKind, ChannelProgressCallback, LogProgressCallback, ProgressCallback, ProgressMessage};
pub use report::{GenerationReport, SequenceStatus};
pub use state::{
    ClassCountSummary, GenerationOutcome, GenerationRecord, SearchState, SequenceState, StopReason,
    SCHEMA_VERSION,
};
pub use store::{JsonSequenceStore, SequenceStore};
