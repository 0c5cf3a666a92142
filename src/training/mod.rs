pub mod estimators;
pub mod gradient_boosting;
pub mod grid_search;
pub mod metrics;
pub mod preprocessor;
pub mod trainer;

pub use estimators::{Estimator, EstimatorSpec, PricePipeline};
pub use metrics::{RegressionMetrics, evaluate, select_best};
pub use preprocessor::Preprocessor;
pub use trainer::{CandidateReport, PriceModelTrainer, TrainingOutcome, train_test_split};
