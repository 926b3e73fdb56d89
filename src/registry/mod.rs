//! Model Registry Module
//!
//! Numbered, staged model versions. [`RegistryStore`] is the seam for an
//! external tracking server; [`VersionRegistry`] is the adapter the workflow
//! talks to.

mod adapter;
mod index;
mod local;
mod memory;

pub use adapter::{ProductionModel, VersionRegistry};
pub use local::LocalRegistry;
pub use memory::InMemoryRegistry;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tracking::TrainingRun;
use crate::training::ModelArtifact;

/// Lifecycle stage of a model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    None,
    Staging,
    Production,
    Archived,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::None => "None",
            Stage::Staging => "Staging",
            Stage::Production => "Production",
            Stage::Archived => "Archived",
        };
        f.write_str(name)
    }
}

/// Registry entry for one trained model (metadata only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub model_name: String,
    /// Monotonic per model, starting at 1
    pub version: u64,
    pub metric: f64,
    pub created_at: DateTime<Utc>,
    pub stage: Stage,
    pub run_id: String,
    /// Artifact kind, e.g. `logistic_regression`
    pub kind: String,
}

/// Storage backend of a model registry.
///
/// Every method is atomic with respect to the others: implementations hold
/// one lock for the whole of each call.
pub trait RegistryStore: Send + Sync {
    /// Store an artifact as the next version of `model`, with stage `None`
    fn create_version(
        &self,
        model: &str,
        artifact: &ModelArtifact,
        metric: f64,
        run_id: &str,
    ) -> Result<ModelVersion>;

    /// Move a version to `stage`. With `archive_existing`, every other version
    /// currently in `stage` becomes `Archived` in the same step.
    fn transition_stage(
        &self,
        model: &str,
        version: u64,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<ModelVersion>;

    /// All versions of `model`, in registration order
    fn versions(&self, model: &str) -> Result<Vec<ModelVersion>>;

    fn artifact(&self, model: &str, version: u64) -> Result<ModelArtifact>;

    fn log_run(&self, run: &TrainingRun) -> Result<()>;

    fn run(&self, run_id: &str) -> Result<TrainingRun>;
}
