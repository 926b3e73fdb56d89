//! Trainer: memory set in, scored artifact out

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use tracing::{info, warn};

use super::estimator::{Estimator, ModelArtifact, TaskType, TrainedModel};
use crate::aggregation::MemorySet;
use crate::error::{MemoryError, Result};
use crate::validation::DatasetSchema;

/// Result of one successful fit
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// In-sample score reported by the fitted model
    pub metric: f64,
    pub model: TrainedModel,
    pub artifact: ModelArtifact,
    /// Rows used for fitting
    pub rows: usize,
    /// Memory-set rows left out because a required cell was empty or unparseable
    pub dropped_rows: usize,
    pub estimator: &'static str,
    pub hyperparameters: BTreeMap<String, String>,
    pub training_time_secs: f64,
}

/// Fits the configured estimator over a memory set
#[derive(Clone)]
pub struct Trainer {
    estimator: Arc<dyn Estimator>,
    schema: DatasetSchema,
}

impl Trainer {
    pub fn new(estimator: Arc<dyn Estimator>, schema: DatasetSchema) -> Self {
        Self { estimator, schema }
    }

    pub fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }

    pub fn train(&self, memory: &MemorySet) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let (x, y) = self.split(&memory.frame)?;
        let dropped_rows = memory.rows() - x.nrows();
        if dropped_rows > 0 {
            warn!(
                dropped_rows,
                memory_rows = memory.rows(),
                "Rows with empty or non-numeric required cells left out of training"
            );
        }

        if x.nrows() == 0 {
            return Err(MemoryError::InsufficientData(
                "memory set has no complete rows".to_string(),
            ));
        }
        if self.estimator.task() == TaskType::BinaryClassification {
            check_binary_labels(&y, &self.schema.label)?;
        }

        let model = self.estimator.fit(&x, &y)?;
        let metric = model.score(&x, &y)?;
        let artifact = model.to_artifact()?;
        let training_time_secs = start.elapsed().as_secs_f64();

        info!(
            estimator = self.estimator.name(),
            rows = x.nrows(),
            metric,
            artifact_bytes = artifact.len(),
            training_time_secs,
            "Model trained"
        );

        Ok(TrainingOutcome {
            metric,
            model,
            artifact,
            rows: x.nrows(),
            dropped_rows,
            estimator: self.estimator.name(),
            hyperparameters: self.estimator.hyperparameters(),
            training_time_secs,
        })
    }

    /// Feature matrix and label vector; rows with any empty required cell are dropped
    pub fn split(&self, frame: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
        let features = self
            .schema
            .features
            .iter()
            .map(|name| numeric_column(frame, name))
            .collect::<Result<Vec<_>>>()?;
        let labels = numeric_column(frame, &self.schema.label)?;

        let complete: Vec<usize> = (0..frame.height())
            .filter(|&row| labels[row].is_some() && features.iter().all(|col| col[row].is_some()))
            .collect();

        let x = Array2::from_shape_fn((complete.len(), features.len()), |(r, c)| {
            features[c][complete[r]].unwrap_or(0.0)
        });
        let y: Array1<f64> = complete.iter().map(|&row| labels[row].unwrap_or(0.0)).collect();

        Ok((x, y))
    }
}

fn numeric_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = frame.column(name).map_err(|_| MemoryError::Schema {
        column: name.to_string(),
        source_name: "memory set".to_string(),
    })?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

fn check_binary_labels(y: &Array1<f64>, label: &str) -> Result<()> {
    if let Some(bad) = y.iter().find(|v| **v != 0.0 && **v != 1.0) {
        return Err(MemoryError::Data(format!(
            "label column '{}' must contain only 0 or 1, found {}",
            label, bad
        )));
    }
    let positives = y.iter().filter(|v| **v == 1.0).count();
    if positives == 0 || positives == y.len() {
        return Err(MemoryError::InsufficientData(format!(
            "label column '{}' needs at least 2 distinct classes",
            label
        )));
    }
    Ok(())
}
