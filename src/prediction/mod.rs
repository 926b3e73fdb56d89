//! Predictions from the live production model

use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

use crate::error::{MemoryError, Result};
use crate::registry::VersionRegistry;
use crate::training::TrainedModel;

pub const EXPENSIVE: &str = "EXPENSIVE";
pub const AFFORDABLE: &str = "AFFORDABLE";

/// One scored input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub inputs: Vec<f64>,
    /// Class (0 or 1) for classifiers, the estimate for regressors
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
    /// Registry version that produced the prediction
    pub version: u64,
}

/// Scores inputs against whichever version is in `Production`
pub struct Predictor {
    registry: VersionRegistry,
}

impl Predictor {
    pub fn new(registry: VersionRegistry) -> Self {
        Self { registry }
    }

    /// Score a single-feature input such as a square footage
    pub fn predict(&self, value: f64) -> Result<Prediction> {
        self.predict_features(&[value])
    }

    pub fn predict_features(&self, features: &[f64]) -> Result<Prediction> {
        let live = self.registry.load_production()?;
        let expected = live.model.n_features();
        if features.len() != expected {
            return Err(MemoryError::Data(format!(
                "model v{} expects {} feature(s), got {}",
                live.version.version,
                expected,
                features.len()
            )));
        }

        let x = Array2::from_shape_vec((1, features.len()), features.to_vec())?;
        let value = live.model.predict(&x)?[0];
        let (probability, label) = match &live.model {
            TrainedModel::LogisticRegression(m) => {
                let p = m.predict_proba(&x)?[0];
                (Some(p), Some(if value >= 0.5 { EXPENSIVE } else { AFFORDABLE }))
            }
            TrainedModel::LinearRegression(_) => (None, None),
        };

        debug!(version = live.version.version, value, "Prediction served");
        Ok(Prediction {
            inputs: features.to_vec(),
            value,
            probability,
            label,
            version: live.version.version,
        })
    }
}
