pub mod labeling;
pub mod metrics;
pub mod trainer;

pub use labeling::{label_batch, predictor_columns, ClassTally, LabeledBatch, LabeledInstance};
pub use metrics::{score_tree, ClassificationScores, ConfusionMatrix};
pub use trainer::{CartTrainer, ClassifierTrainer, TrainingSet};
