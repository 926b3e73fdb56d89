//! Experiment Tracking Module
//!
//! Training runs in the style of an MLflow run: parameters and metrics are
//! logged while the run is open, and the closed record is immutable.

mod run;

pub use run::{ActiveRun, RunStatus, TrainingRun};
