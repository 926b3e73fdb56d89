//! Local file system storage backend

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{check_key, ObjectInfo, ObjectStore};
use crate::error::{MemoryError, Result};

/// Directory-backed object store. Keys map to paths under `base_dir`.
pub struct LocalStore {
    base_dir: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .map_err(|e| MemoryError::system("Failed to create store directory", e))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        check_key(key)?;
        Ok(key.split('/').fold(self.base_dir.clone(), |path, part| path.join(part)))
    }

    fn walk(&self, dir: &Path, out: &mut Vec<ObjectInfo>) -> Result<()> {
        let entries = fs::read_dir(dir)
            .map_err(|e| MemoryError::system("Failed to list store directory", e))?;

        for entry in entries {
            let entry = entry.map_err(|e| MemoryError::system("Failed to read directory entry", e))?;
            let path = entry.path();
            let meta = entry
                .metadata()
                .map_err(|e| MemoryError::system("Failed to stat object", e))?;

            if meta.is_dir() {
                self.walk(&path, out)?;
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.base_dir) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let updated: DateTime<Utc> = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            out.push(ObjectInfo { key, size: meta.len(), updated });
        }
        Ok(())
    }
}

impl ObjectStore for LocalStore {
    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        if self.base_dir.exists() {
            self.walk(&self.base_dir, &mut objects)?;
        }
        objects.retain(|o| o.key.starts_with(prefix));
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| MemoryError::system(&format!("Failed to read '{}'", key), e))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| MemoryError::system("Failed to create object directory", e))?;
        }
        fs::write(&path, bytes)
            .map_err(|e| MemoryError::system(&format!("Failed to write '{}'", key), e))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.is_file())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if path.is_file() {
            fs::remove_file(&path)
                .map_err(|e| MemoryError::system(&format!("Failed to delete '{}'", key), e))?;
        }
        Ok(())
    }
}
