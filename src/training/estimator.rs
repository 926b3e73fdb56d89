//! Estimator capability and fitted model variants

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::linear_models::{LinearModel, LogisticModel};
use crate::error::{MemoryError, Result};

/// Kind of learning problem an estimator solves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    BinaryClassification,
    Regression,
}

/// Something that can fit a model to a feature matrix and label vector.
///
/// Algorithm choice and hyperparameters live entirely in the implementor.
pub trait Estimator: Send + Sync {
    /// Short algorithm name, stored with every registered version
    fn name(&self) -> &'static str;

    fn task(&self) -> TaskType;

    /// Hyperparameters recorded on the training run
    fn hyperparameters(&self) -> BTreeMap<String, String>;

    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<TrainedModel>;
}

/// A fitted model, ready to score or predict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LogisticRegression(LogisticModel),
    LinearRegression(LinearModel),
}

impl TrainedModel {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::LogisticRegression(m) => m.predict(x),
            TrainedModel::LinearRegression(m) => m.predict(x),
        }
    }

    /// Accuracy for classifiers, R² for regressors
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        match self {
            TrainedModel::LogisticRegression(m) => m.score(x, y),
            TrainedModel::LinearRegression(m) => m.score(x, y),
        }
    }

    pub fn task(&self) -> TaskType {
        match self {
            TrainedModel::LogisticRegression(_) => TaskType::BinaryClassification,
            TrainedModel::LinearRegression(_) => TaskType::Regression,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            TrainedModel::LogisticRegression(m) => m.coefficients.len(),
            TrainedModel::LinearRegression(m) => m.coefficients.len(),
        }
    }

    pub fn to_artifact(&self) -> Result<ModelArtifact> {
        let kind = match self {
            TrainedModel::LogisticRegression(_) => "logistic_regression",
            TrainedModel::LinearRegression(_) => "linear_regression",
        };
        Ok(ModelArtifact {
            kind: kind.to_string(),
            bytes: bincode::serialize(self)?,
        })
    }
}

/// Serialized model handed to the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: String,
    pub bytes: Vec<u8>,
}

impl ModelArtifact {
    pub fn load(&self) -> Result<TrainedModel> {
        let model: TrainedModel = bincode::deserialize(&self.bytes)
            .map_err(|e| MemoryError::Serialization(format!("Corrupt {} artifact: {}", self.kind, e)))?;
        Ok(model)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::LogisticRegression;
    use ndarray::array;

    #[test]
    fn test_artifact_restores_predictions() {
        let x = array![[500.0], [800.0], [3000.0], [3500.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let model = LogisticRegression::new().fit(&x, &y).unwrap();

        let artifact = model.to_artifact().unwrap();
        assert_eq!(artifact.kind, "logistic_regression");

        let restored = artifact.load().unwrap();
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
        assert_eq!(restored.task(), TaskType::BinaryClassification);
    }

    #[test]
    fn test_corrupt_artifact() {
        let artifact = ModelArtifact {
            kind: "logistic_regression".to_string(),
            bytes: vec![0xff, 0x01],
        };
        assert!(matches!(artifact.load(), Err(MemoryError::Serialization(_))));
    }
}
