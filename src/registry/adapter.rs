//! Version registry adapter for a single model name

use std::sync::Arc;

use tracing::info;

use super::{ModelVersion, RegistryStore, Stage};
use crate::error::{MemoryError, Result};
use crate::tracking::{ActiveRun, TrainingRun};
use crate::training::{ModelArtifact, TrainedModel};

/// The live model together with its registry entry
#[derive(Debug, Clone)]
pub struct ProductionModel {
    pub version: ModelVersion,
    pub model: TrainedModel,
}

/// Registers, promotes and loads versions of one fixed model
#[derive(Clone)]
pub struct VersionRegistry {
    store: Arc<dyn RegistryStore>,
    model_name: String,
}

impl VersionRegistry {
    pub fn new(store: Arc<dyn RegistryStore>, model_name: impl Into<String>) -> Self {
        Self {
            store,
            model_name: model_name.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Record `artifact` as the next version, with no stage
    pub fn register(&self, artifact: &ModelArtifact, metric: f64, run: &ActiveRun) -> Result<u64> {
        let entry = self
            .store
            .create_version(&self.model_name, artifact, metric, run.run_id())?;
        info!(
            model = %self.model_name,
            version = entry.version,
            metric,
            run_id = %run.run_id(),
            "Model version registered"
        );
        Ok(entry.version)
    }

    /// Make `version` the only `Production` version; the previous one is archived
    pub fn promote(&self, version: u64) -> Result<ModelVersion> {
        let entry = self
            .store
            .transition_stage(&self.model_name, version, Stage::Production, true)?;
        info!(model = %self.model_name, version, "Model version promoted to Production");
        Ok(entry)
    }

    /// Move `version` to an arbitrary stage without touching other versions
    pub fn transition(&self, version: u64, stage: Stage) -> Result<ModelVersion> {
        if stage == Stage::Production {
            return self.promote(version);
        }
        self.store.transition_stage(&self.model_name, version, stage, false)
    }

    /// All versions, highest version number first
    pub fn history(&self) -> Result<Vec<ModelVersion>> {
        let mut versions = self.store.versions(&self.model_name)?;
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    pub fn production_version(&self) -> Result<ModelVersion> {
        self.store
            .versions(&self.model_name)?
            .into_iter()
            .find(|v| v.stage == Stage::Production)
            .ok_or_else(|| MemoryError::NoProductionVersion(self.model_name.clone()))
    }

    /// Fetch and deserialize the live model
    pub fn load_production(&self) -> Result<ProductionModel> {
        let version = self.production_version()?;
        let artifact = self
            .store
            .artifact(&self.model_name, version.version)
            .map_err(|e| match e {
                // The index says the version exists, so a missing artifact is infrastructure
                MemoryError::NotFound { .. } => MemoryError::System(e.to_string()),
                other => other,
            })?;
        let model = artifact.load()?;
        Ok(ProductionModel { version, model })
    }

    pub fn record_run(&self, run: &TrainingRun) -> Result<()> {
        self.store.log_run(run)
    }

    /// Metrics and parameters of a closed run
    pub fn run(&self, run_id: &str) -> Result<TrainingRun> {
        self.store.run(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use crate::training::{Estimator, LogisticRegression};
    use ndarray::array;

    fn registry() -> VersionRegistry {
        VersionRegistry::new(Arc::new(InMemoryRegistry::new()), "housing")
    }

    fn artifact() -> ModelArtifact {
        let x = array![[500.0], [3000.0]];
        let y = array![0.0, 1.0];
        LogisticRegression::new().fit(&x, &y).unwrap().to_artifact().unwrap()
    }

    #[test]
    fn test_register_starts_without_stage() {
        let registry = registry();
        let run = ActiveRun::start("test");
        let version = registry.register(&artifact(), 1.0, &run).unwrap();
        assert_eq!(version, 1);

        let history = registry.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].stage, Stage::None);
        assert_eq!(history[0].run_id, run.run_id());
    }

    #[test]
    fn test_history_is_descending() {
        let registry = registry();
        let run = ActiveRun::start("test");
        for _ in 0..3 {
            registry.register(&artifact(), 0.5, &run).unwrap();
        }
        let versions: Vec<u64> = registry.history().unwrap().iter().map(|v| v.version).collect();
        assert_eq!(versions, vec![3, 2, 1]);
    }

    #[test]
    fn test_promote_archives_previous() {
        let registry = registry();
        let run = ActiveRun::start("test");
        for _ in 0..3 {
            registry.register(&artifact(), 0.5, &run).unwrap();
        }
        registry.promote(2).unwrap();
        registry.promote(3).unwrap();

        let history = registry.history().unwrap();
        assert_eq!(history[0].stage, Stage::Production);
        assert_eq!(history[1].stage, Stage::Archived);
        assert_eq!(history[2].stage, Stage::None);
    }

    #[test]
    fn test_promote_missing_version() {
        let err = registry().promote(7).unwrap_err();
        assert!(matches!(err, MemoryError::NotFound { version: 7, .. }));
    }

    #[test]
    fn test_load_production_requires_promotion() {
        let registry = registry();
        let run = ActiveRun::start("test");
        registry.register(&artifact(), 1.0, &run).unwrap();

        let err = registry.load_production().unwrap_err();
        assert!(matches!(err, MemoryError::NoProductionVersion(_)));

        registry.promote(1).unwrap();
        let live = registry.load_production().unwrap();
        assert_eq!(live.version.version, 1);
        assert_eq!(live.model.predict(&array![[4000.0]]).unwrap()[0], 1.0);
    }

    #[test]
    fn test_staging_leaves_production_alone() {
        let registry = registry();
        let run = ActiveRun::start("test");
        registry.register(&artifact(), 1.0, &run).unwrap();
        registry.register(&artifact(), 1.0, &run).unwrap();
        registry.promote(1).unwrap();
        registry.transition(2, Stage::Staging).unwrap();

        assert_eq!(registry.production_version().unwrap().version, 1);
    }
}
