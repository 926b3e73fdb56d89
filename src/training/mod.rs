//! Model training module
//!
//! Fits a pluggable [`Estimator`] over a memory set and packages the result
//! as a transportable [`ModelArtifact`]. Shipped estimators:
//! - Logistic regression (binary classification, accuracy)
//! - Linear regression (regression, R²)

mod estimator;
pub mod linear_models;
mod trainer;

pub use estimator::{Estimator, ModelArtifact, TaskType, TrainedModel};
pub use linear_models::{LinearModel, LinearRegression, LogisticModel, LogisticRegression, Standardizer};
pub use trainer::{Trainer, TrainingOutcome};
