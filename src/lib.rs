//! Collective Memory - accumulate datasets, retrain on all of them
//!
//! Every accepted upload joins a persistent memory of datasets. Each upload
//! triggers a retrain on the deduplicated union of everything stored, and the
//! resulting model is registered as a new version and promoted to Production.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`validation`] - Schema and numeric-format checks on uploads
//! - [`aggregation`] - Merge of the current upload with stored history
//! - [`training`] - Pluggable estimators and the trainer
//! - [`registry`] - Model versions, stages and promotion
//! - [`workflow`] - Orchestration of one upload from validation to promotion
//!
//! ## Infrastructure
//! - [`storage`] - Object store abstraction and dataset catalog
//! - [`tracking`] - Training runs with parameters and metrics
//! - [`jobs`] - Background execution and job status
//! - [`config`] - Environment-driven configuration
//!
//! ## Services
//! - [`prediction`] - Scoring against the Production version
//! - [`synthetic`] - Synthetic housing datasets
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Pipeline
pub mod validation;
pub mod aggregation;
pub mod training;
pub mod registry;
pub mod workflow;

// Infrastructure
pub mod storage;
pub mod tracking;
pub mod jobs;

// Services
pub mod prediction;
pub mod synthetic;
pub mod cli;

pub use error::{MemoryError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ErrorKind, MemoryError, Result};

    // Configuration
    pub use crate::config::MemoryConfig;

    // Storage
    pub use crate::storage::{InMemoryStore, LocalStore, ObjectStore};

    // Pipeline
    pub use crate::validation::{CleanDataset, DatasetSchema};
    pub use crate::aggregation::{MemoryAggregator, MemorySet};
    pub use crate::training::{Estimator, LinearRegression, LogisticRegression, TaskType, Trainer};
    pub use crate::registry::{InMemoryRegistry, LocalRegistry, ModelVersion, Stage, VersionRegistry};
    pub use crate::workflow::{Upload, Workflow, WorkflowOutcome, WorkflowState};

    // Services
    pub use crate::jobs::{JobStatus, TrainingQueue};
    pub use crate::prediction::{Prediction, Predictor};
}
