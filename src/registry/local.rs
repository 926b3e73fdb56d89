//! File system registry store
//!
//! Layout under the registry root:
//! - `index.json`: versions, stages, counters and runs
//! - `<model>/v<version>.bin`: bincode-serialized artifacts

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;

use super::index::RegistryIndex;
use super::{ModelVersion, RegistryStore, Stage};
use crate::error::{MemoryError, Result};
use crate::tracking::TrainingRun;
use crate::training::ModelArtifact;

/// Registry persisted in a local directory.
///
/// `index.json` is the only source of truth. Every operation re-reads it while
/// holding an advisory lock on `registry.lock`, so several processes can share
/// one directory without issuing a version number twice.
pub struct LocalRegistry {
    root: PathBuf,
    local: Mutex<()>,
}

impl LocalRegistry {
    /// Create or open a registry at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| MemoryError::system("Failed to create registry", e))?;

        let registry = Self {
            root,
            local: Mutex::new(()),
        };
        // Fail early on an unreadable index
        registry.read(|_| Ok(()))?;
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, model: &str, version: u64) -> PathBuf {
        self.root.join(model).join(format!("v{}.bin", version))
    }

    fn lock_file(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.root.join("registry.lock"))
            .map_err(|e| MemoryError::system("Failed to open registry lock", e))
    }

    fn load_index(&self) -> Result<RegistryIndex> {
        let index_path = self.root.join("index.json");
        if !index_path.exists() {
            return Ok(RegistryIndex::default());
        }
        let file = File::open(&index_path)
            .map_err(|e| MemoryError::system("Failed to open registry index", e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| MemoryError::system("Failed to read registry index", e))
    }

    /// Run `f` on the current index under a shared lock
    fn read<T>(&self, f: impl FnOnce(&RegistryIndex) -> Result<T>) -> Result<T> {
        let _local = self.local.lock();
        let lock = self.lock_file()?;
        FileExt::lock_shared(&lock).map_err(|e| MemoryError::system("Failed to lock registry", e))?;
        let result = self.load_index().and_then(|index| f(&index));
        let _ = FileExt::unlock(&lock);
        result
    }

    /// Re-read the index, apply `f` and write the result back, all under an
    /// exclusive lock. Nothing is written when `f` fails.
    fn update<T>(&self, f: impl FnOnce(&mut RegistryIndex) -> Result<T>) -> Result<T> {
        let _local = self.local.lock();
        let lock = self.lock_file()?;
        FileExt::lock_exclusive(&lock).map_err(|e| MemoryError::system("Failed to lock registry", e))?;
        let result = self.load_index().and_then(|mut index| {
            let value = f(&mut index)?;
            self.save_index(&index)?;
            Ok(value)
        });
        let _ = FileExt::unlock(&lock);
        result
    }

    /// Replace `index.json` atomically via a temporary file
    fn save_index(&self, index: &RegistryIndex) -> Result<()> {
        let tmp_path = self.root.join("index.json.tmp");
        {
            let file = File::create(&tmp_path)
                .map_err(|e| MemoryError::system("Failed to create registry index", e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, index)
                .map_err(|e| MemoryError::system("Failed to write registry index", e))?;
            writer
                .flush()
                .map_err(|e| MemoryError::system("Failed to flush registry index", e))?;
        }
        fs::rename(&tmp_path, self.root.join("index.json"))
            .map_err(|e| MemoryError::system("Failed to replace registry index", e))
    }
}

fn check_model_name(model: &str) -> Result<()> {
    let valid = !model.is_empty()
        && model
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && model != "."
        && model != "..";
    if valid {
        Ok(())
    } else {
        Err(MemoryError::Config(format!("Invalid model name: '{}'", model)))
    }
}

impl RegistryStore for LocalRegistry {
    fn create_version(
        &self,
        model: &str,
        artifact: &ModelArtifact,
        metric: f64,
        run_id: &str,
    ) -> Result<ModelVersion> {
        check_model_name(model)?;
        let bytes = bincode::serialize(artifact)?;

        self.update(|index| {
            // Artifact first: an index entry never points at a missing file
            let path = self.artifact_path(model, index.next_version(model));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| MemoryError::system("Failed to create model directory", e))?;
            }
            fs::write(&path, &bytes)
                .map_err(|e| MemoryError::system("Failed to write model artifact", e))?;

            Ok(index.insert_version(model, metric, run_id, &artifact.kind))
        })
    }

    fn transition_stage(
        &self,
        model: &str,
        version: u64,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<ModelVersion> {
        self.update(|index| index.transition(model, version, stage, archive_existing))
    }

    fn versions(&self, model: &str) -> Result<Vec<ModelVersion>> {
        self.read(|index| Ok(index.versions(model)))
    }

    fn artifact(&self, model: &str, version: u64) -> Result<ModelArtifact> {
        let bytes = self.read(|index| {
            index.find(model, version)?;
            fs::read(self.artifact_path(model, version))
                .map_err(|e| MemoryError::system("Failed to read model artifact", e))
        })?;
        Ok(bincode::deserialize(&bytes)?)
    }

    fn log_run(&self, run: &TrainingRun) -> Result<()> {
        self.update(|index| {
            index.runs.insert(run.run_id().to_string(), run.clone());
            Ok(())
        })
    }

    fn run(&self, run_id: &str) -> Result<TrainingRun> {
        self.read(|index| index.run(run_id))
    }
}
