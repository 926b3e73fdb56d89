//! Workflow configuration

use std::path::PathBuf;

use crate::error::{MemoryError, Result};

/// Runtime configuration for the collective-memory workflow.
///
/// `Default` reads the `MEMORY_*` environment variables and falls back to
/// local directories, so a bare checkout works without any setup.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Root directory of the object store ("bucket")
    pub store_dir: PathBuf,
    /// Key prefix under which raw uploads are kept
    pub uploads_prefix: String,
    /// Root directory of the model registry
    pub registry_dir: PathBuf,
    /// Registered model name
    pub model_name: String,
    /// Numeric feature columns (normalized names)
    pub feature_columns: Vec<String>,
    /// Numeric 0/1 label column (normalized name)
    pub label_column: String,
    /// Promote every successfully registered version to production
    pub promote_on_success: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            store_dir: std::env::var("MEMORY_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/bucket")),
            uploads_prefix: std::env::var("MEMORY_UPLOADS_PREFIX")
                .unwrap_or_else(|_| "uploads/".to_string()),
            registry_dir: std::env::var("MEMORY_REGISTRY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/registry")),
            model_name: std::env::var("MEMORY_MODEL_NAME")
                .unwrap_or_else(|_| "housing_memory_model".to_string()),
            feature_columns: std::env::var("MEMORY_FEATURE_COLUMNS")
                .map(|s| parse_column_list(&s))
                .unwrap_or_else(|_| vec!["sqft".to_string()]),
            label_column: std::env::var("MEMORY_LABEL_COLUMN")
                .map(|s| normalize_column_name(&s))
                .unwrap_or_else(|_| "is_expensive".to_string()),
            promote_on_success: std::env::var("MEMORY_PROMOTE_ON_SUCCESS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        }
    }
}

impl MemoryConfig {
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    pub fn with_registry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.registry_dir = dir.into();
        self
    }

    pub fn with_uploads_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.uploads_prefix = prefix.into();
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_feature_columns(mut self, columns: Vec<String>) -> Self {
        self.feature_columns = columns.iter().map(|c| normalize_column_name(c)).collect();
        self
    }

    pub fn with_label_column(mut self, column: impl AsRef<str>) -> Self {
        self.label_column = normalize_column_name(column.as_ref());
        self
    }

    pub fn with_promote_on_success(mut self, promote: bool) -> Self {
        self.promote_on_success = promote;
        self
    }

    /// Check the configuration for values the workflow cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(MemoryError::Config("model name must not be empty".to_string()));
        }
        if self.uploads_prefix.is_empty() {
            return Err(MemoryError::Config("uploads prefix must not be empty".to_string()));
        }
        if self.feature_columns.is_empty() {
            return Err(MemoryError::Config("at least one feature column is required".to_string()));
        }
        if self.label_column.is_empty() {
            return Err(MemoryError::Config("label column must not be empty".to_string()));
        }
        if self.feature_columns.contains(&self.label_column) {
            return Err(MemoryError::Config(format!(
                "label column '{}' cannot also be a feature",
                self.label_column
            )));
        }
        Ok(())
    }

    /// Storage key of an uploaded dataset
    pub fn upload_key(&self, dataset_name: &str) -> String {
        format!("{}{}", self.uploads_prefix, dataset_name)
    }
}

/// Trim and lowercase a column name
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn parse_column_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(normalize_column_name)
        .filter(|c| !c.is_empty())
        .collect()
}
