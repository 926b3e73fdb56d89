//! Memory aggregator

use std::sync::Arc;

use polars::functions::concat_df_diagonal;
use polars::prelude::*;
use tracing::{info, warn};

use crate::error::{MemoryError, Result};
use crate::storage::{object_name, ObjectStore};
use crate::validation::{parse_csv, validate, CleanDataset, DatasetSchema};

/// A historical dataset left out of the memory set
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedDataset {
    pub name: String,
    pub reason: String,
}

/// Deduplicated union of the current dataset and all accepted history
#[derive(Debug, Clone)]
pub struct MemorySet {
    pub frame: DataFrame,
    /// Datasets that contributed rows, current dataset first
    pub sources: Vec<String>,
    /// Historical datasets that failed to parse or validate
    pub skipped: Vec<SkippedDataset>,
}

impl MemorySet {
    pub fn rows(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Builds memory sets from an object store
pub struct MemoryAggregator {
    store: Arc<dyn ObjectStore>,
    schema: DatasetSchema,
    prefix: String,
}

impl MemoryAggregator {
    pub fn new(store: Arc<dyn ObjectStore>, schema: DatasetSchema, prefix: impl Into<String>) -> Self {
        Self {
            store,
            schema,
            prefix: prefix.into(),
        }
    }

    /// Merge `current` with every stored dataset except the one sharing its name.
    ///
    /// Stored datasets that fail validation are skipped with a warning. Storage
    /// failures abort the aggregation.
    pub fn aggregate(&self, current: &CleanDataset) -> Result<MemorySet> {
        let (history, skipped) = self.load_history(Some(&current.source_name))?;

        let mut datasets = Vec::with_capacity(history.len() + 1);
        datasets.push(current.clone());
        datasets.extend(history);

        self.merge(datasets, skipped)
    }

    /// Build the memory set from stored datasets alone
    pub fn aggregate_stored(&self) -> Result<MemorySet> {
        let (history, skipped) = self.load_history(None)?;
        if history.is_empty() {
            return Err(MemoryError::InsufficientData(format!(
                "no valid datasets stored under '{}'",
                self.prefix
            )));
        }
        self.merge(history, skipped)
    }

    fn load_history(&self, exclude: Option<&str>) -> Result<(Vec<CleanDataset>, Vec<SkippedDataset>)> {
        let mut accepted = Vec::new();
        let mut skipped = Vec::new();

        for object in self.store.list(&self.prefix)? {
            if !object.key.ends_with(".csv") {
                continue;
            }
            let name = object_name(&object.key);
            if exclude == Some(name) {
                continue;
            }

            let bytes = self.store.read(&object.key)?;
            let parsed = parse_csv(&bytes).and_then(|frame| validate(frame, name, &self.schema));
            match parsed {
                Ok(clean) => accepted.push(clean),
                Err(e) if e.is_user_error() => {
                    warn!(source = %name, error = %e, "Skipping invalid historical dataset");
                    skipped.push(SkippedDataset {
                        name: name.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok((accepted, skipped))
    }

    fn merge(&self, datasets: Vec<CleanDataset>, skipped: Vec<SkippedDataset>) -> Result<MemorySet> {
        let sources: Vec<String> = datasets.iter().map(|d| d.source_name.clone()).collect();
        let contributed: usize = datasets.iter().map(CleanDataset::rows).sum();

        let frames = datasets
            .into_iter()
            .map(|d| self.align_extra_columns(d.frame))
            .collect::<Result<Vec<_>>>()?;

        let stacked = concat_df_diagonal(&frames)?;
        let frame = stacked.unique_stable(None, UniqueKeepStrategy::First, None)?;

        info!(
            sources = sources.len(),
            skipped = skipped.len(),
            contributed_rows = contributed,
            memory_rows = frame.height(),
            "Collective memory aggregated"
        );

        Ok(MemorySet { frame, sources, skipped })
    }

    /// Cast non-required columns to strings so frames with different extra
    /// columns stack without dtype conflicts
    fn align_extra_columns(&self, mut frame: DataFrame) -> Result<DataFrame> {
        let required = self.schema.required_columns();
        let extra: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| !required.contains(&name.as_str()))
            .collect();

        for name in extra {
            let column = frame.column(&name)?;
            if column.dtype() != &DataType::String {
                let cast = column.cast(&DataType::String)?;
                frame.with_column(cast)?;
            }
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn clean(csv: &str, name: &str) -> CleanDataset {
        validate(parse_csv(csv.as_bytes()).unwrap(), name, &DatasetSchema::default()).unwrap()
    }

    fn aggregator(store: Arc<InMemoryStore>) -> MemoryAggregator {
        MemoryAggregator::new(store, DatasetSchema::default(), "uploads/")
    }

    #[test]
    fn test_merges_and_deduplicates() {
        let store = Arc::new(InMemoryStore::new());
        store.write("uploads/old.csv", b"sqft,is_expensive\n500,0\n2500,1\n").unwrap();

        let current = clean("sqft,is_expensive\n500,0\n4000,1\n", "new.csv");
        let memory = aggregator(store).aggregate(&current).unwrap();

        assert_eq!(memory.rows(), 3);
        assert_eq!(memory.sources, vec!["new.csv", "old.csv"]);
        assert!(memory.skipped.is_empty());
    }

    #[test]
    fn test_current_dataset_not_double_counted() {
        let store = Arc::new(InMemoryStore::new());
        // The upload itself is already persisted under its name
        store.write("uploads/new.csv", b"sqft,is_expensive\n500,0\n600,0\n").unwrap();

        let current = clean("sqft,is_expensive\n500,0\n600,0\n", "new.csv");
        let memory = aggregator(store).aggregate(&current).unwrap();
        assert_eq!(memory.sources, vec!["new.csv"]);
        assert_eq!(memory.rows(), 2);
    }

    #[test]
    fn test_invalid_history_is_skipped() {
        let store = Arc::new(InMemoryStore::new());
        store.write("uploads/corrupt.csv", b"sqft,is_expensive\n5a0,0\n").unwrap();
        store.write("uploads/nolabel.csv", b"sqft\n500\n").unwrap();
        store.write("uploads/good.csv", b"sqft,is_expensive\n3000,1\n").unwrap();
        store.write("uploads/readme.txt", b"not data").unwrap();

        let current = clean("sqft,is_expensive\n500,0\n", "new.csv");
        let memory = aggregator(store).aggregate(&current).unwrap();

        assert_eq!(memory.rows(), 2);
        let skipped: Vec<&str> = memory.skipped.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skipped, vec!["corrupt.csv", "nolabel.csv"]);
    }

    #[test]
    fn test_different_extra_columns_stack() {
        let store = Arc::new(InMemoryStore::new());
        store.write("uploads/ids.csv", b"id,sqft,is_expensive\n7,900,0\n").unwrap();

        let current = clean("sqft,is_expensive,zip\n3100,1,90210\n", "zips.csv");
        let memory = aggregator(store).aggregate(&current).unwrap();

        assert_eq!(memory.rows(), 2);
        assert_eq!(memory.frame.width(), 4);
    }

    #[test]
    fn test_aggregate_stored_requires_data() {
        let store = Arc::new(InMemoryStore::new());
        let err = aggregator(store.clone()).aggregate_stored().unwrap_err();
        assert!(matches!(err, MemoryError::InsufficientData(_)));

        store.write("uploads/a.csv", b"sqft,is_expensive\n500,0\n500,0\n").unwrap();
        let memory = aggregator(store).aggregate_stored().unwrap();
        assert_eq!(memory.rows(), 1);
    }
}
