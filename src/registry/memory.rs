//! In-memory registry store

use std::collections::HashMap;

use parking_lot::Mutex;

use super::index::RegistryIndex;
use super::{ModelVersion, RegistryStore, Stage};
use crate::error::{MemoryError, Result};
use crate::tracking::TrainingRun;
use crate::training::ModelArtifact;

#[derive(Default)]
struct Inner {
    index: RegistryIndex,
    artifacts: HashMap<(String, u64), ModelArtifact>,
}

/// Registry held in process memory. Useful for tests and single-process runs.
#[derive(Default)]
pub struct InMemoryRegistry {
    inner: Mutex<Inner>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for InMemoryRegistry {
    fn create_version(
        &self,
        model: &str,
        artifact: &ModelArtifact,
        metric: f64,
        run_id: &str,
    ) -> Result<ModelVersion> {
        let mut inner = self.inner.lock();
        let entry = inner.index.insert_version(model, metric, run_id, &artifact.kind);
        inner
            .artifacts
            .insert((model.to_string(), entry.version), artifact.clone());
        Ok(entry)
    }

    fn transition_stage(
        &self,
        model: &str,
        version: u64,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<ModelVersion> {
        self.inner.lock().index.transition(model, version, stage, archive_existing)
    }

    fn versions(&self, model: &str) -> Result<Vec<ModelVersion>> {
        Ok(self.inner.lock().index.versions(model))
    }

    fn artifact(&self, model: &str, version: u64) -> Result<ModelArtifact> {
        self.inner
            .lock()
            .artifacts
            .get(&(model.to_string(), version))
            .cloned()
            .ok_or_else(|| MemoryError::NotFound {
                model: model.to_string(),
                version,
            })
    }

    fn log_run(&self, run: &TrainingRun) -> Result<()> {
        self.inner
            .lock()
            .index
            .runs
            .insert(run.run_id().to_string(), run.clone());
        Ok(())
    }

    fn run(&self, run_id: &str) -> Result<TrainingRun> {
        self.inner.lock().index.run(run_id)
    }
}
