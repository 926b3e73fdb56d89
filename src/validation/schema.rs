//! Required-column schema

use crate::config::{normalize_column_name, MemoryConfig};

/// Columns a dataset must carry to be trainable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSchema {
    /// Numeric feature columns, normalized
    pub features: Vec<String>,
    /// Numeric 0/1 label column, normalized
    pub label: String,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        Self::new(["sqft"], "is_expensive")
    }
}

impl DatasetSchema {
    pub fn new<I, S>(features: I, label: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            features: features.into_iter().map(|f| normalize_column_name(f.as_ref())).collect(),
            label: normalize_column_name(label),
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(&config.feature_columns, &config.label_column)
    }

    /// Features first, then the label
    pub fn required_columns(&self) -> Vec<&str> {
        self.features
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.label.as_str()))
            .collect()
    }
}
