//! Model training and evaluation
//!
//! Dataset assembly from the feature store, chronological train/validation
//! splitting, gradient-descent fitting, and held-out metrics.

pub mod dataset;
pub mod evaluate;
pub mod metrics;
pub mod trainer;

pub use dataset::{build_dataset, Dataset, Example};
pub use evaluate::{evaluate, EvaluationReport};
pub use metrics::{CalibrationBucket, ClassificationMetrics, RegressionMetrics};
pub use trainer::{train, train_all, TrainedModel};
