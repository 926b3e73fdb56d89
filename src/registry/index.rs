//! Registry index shared by the store implementations

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ModelVersion, Stage};
use crate::error::{MemoryError, Result};
use crate::tracking::TrainingRun;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RegistryIndex {
    /// Versions by model name, in registration order
    pub models: BTreeMap<String, Vec<ModelVersion>>,
    /// Last assigned version number per model
    pub counters: BTreeMap<String, u64>,
    /// Closed runs by id
    pub runs: BTreeMap<String, TrainingRun>,
}

impl RegistryIndex {
    /// Reserve the next version number without recording the version yet
    pub fn next_version(&self, model: &str) -> u64 {
        self.counters.get(model).copied().unwrap_or(0) + 1
    }

    pub fn insert_version(&mut self, model: &str, metric: f64, run_id: &str, kind: &str) -> ModelVersion {
        let version = self.next_version(model);
        self.counters.insert(model.to_string(), version);

        let entry = ModelVersion {
            model_name: model.to_string(),
            version,
            metric,
            created_at: Utc::now(),
            stage: Stage::None,
            run_id: run_id.to_string(),
            kind: kind.to_string(),
        };
        self.models.entry(model.to_string()).or_default().push(entry.clone());
        entry
    }

    pub fn transition(
        &mut self,
        model: &str,
        version: u64,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<ModelVersion> {
        let versions = self.models.get_mut(model).ok_or_else(|| MemoryError::NotFound {
            model: model.to_string(),
            version,
        })?;

        let target = versions
            .iter()
            .position(|v| v.version == version)
            .ok_or_else(|| MemoryError::NotFound {
                model: model.to_string(),
                version,
            })?;

        if archive_existing && stage != Stage::None && stage != Stage::Archived {
            for other in versions.iter_mut().filter(|v| v.version != version && v.stage == stage) {
                other.stage = Stage::Archived;
            }
        }
        versions[target].stage = stage;

        Ok(versions[target].clone())
    }

    pub fn find(&self, model: &str, version: u64) -> Result<&ModelVersion> {
        self.models
            .get(model)
            .and_then(|versions| versions.iter().find(|v| v.version == version))
            .ok_or_else(|| MemoryError::NotFound {
                model: model.to_string(),
                version,
            })
    }

    pub fn versions(&self, model: &str) -> Vec<ModelVersion> {
        self.models.get(model).cloned().unwrap_or_default()
    }

    pub fn run(&self, run_id: &str) -> Result<TrainingRun> {
        self.runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| MemoryError::System(format!("Run not found: {}", run_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_monotonic() {
        let mut index = RegistryIndex::default();
        assert_eq!(index.insert_version("m", 0.5, "r1", "k").version, 1);
        assert_eq!(index.insert_version("m", 0.6, "r2", "k").version, 2);
        assert_eq!(index.insert_version("other", 0.6, "r3", "k").version, 1);
    }

    #[test]
    fn test_transition_archives_existing() {
        let mut index = RegistryIndex::default();
        for _ in 0..3 {
            index.insert_version("m", 0.9, "r", "k");
        }
        index.transition("m", 2, Stage::Production, true).unwrap();
        index.transition("m", 3, Stage::Production, true).unwrap();

        let stages: Vec<Stage> = index.versions("m").iter().map(|v| v.stage).collect();
        assert_eq!(stages, vec![Stage::None, Stage::Archived, Stage::Production]);
    }

    #[test]
    fn test_transition_without_archive_keeps_others() {
        let mut index = RegistryIndex::default();
        index.insert_version("m", 0.9, "r", "k");
        index.insert_version("m", 0.9, "r", "k");
        index.transition("m", 1, Stage::Staging, false).unwrap();
        index.transition("m", 2, Stage::Staging, false).unwrap();
        assert!(index.versions("m").iter().all(|v| v.stage == Stage::Staging));
    }

    #[test]
    fn test_transition_missing_version() {
        let mut index = RegistryIndex::default();
        let err = index.transition("m", 9, Stage::Production, true).unwrap_err();
        assert!(matches!(err, MemoryError::NotFound { version: 9, .. }));
    }
}
