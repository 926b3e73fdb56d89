//! Linear model implementations

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::estimator::{Estimator, TaskType, TrainedModel};
use crate::error::{MemoryError, Result};

fn check_shapes(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(MemoryError::Data(format!(
            "shape mismatch: {} feature rows, {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(MemoryError::InsufficientData("no training rows".to_string()));
    }
    Ok(())
}

/// Solve `a * x = b` by Gauss-Jordan elimination with partial pivoting
fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let mut aug = Array2::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }
        if max_row != col {
            for j in 0..=n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-12 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..=n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// Per-feature standardization (zero mean, unit variance).
///
/// Square footage spans thousands, so gradient descent on raw values would
/// saturate the sigmoid immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl Standardizer {
    pub fn fit(x: &Array2<f64>) -> Self {
        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        Self { mean, scale }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            return Err(MemoryError::Data(format!(
                "expected {} features, got {}",
                self.mean.len(),
                x.ncols()
            )));
        }
        Ok((x - &self.mean) / &self.scale)
    }
}

/// Logistic regression estimator for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }
}

impl Estimator for LogisticRegression {
    fn name(&self) -> &'static str {
        "logistic_regression"
    }

    fn task(&self) -> TaskType {
        TaskType::BinaryClassification
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("alpha".to_string(), self.alpha.to_string()),
            ("max_iter".to_string(), self.max_iter.to_string()),
            ("tol".to_string(), self.tol.to_string()),
            ("learning_rate".to_string(), self.learning_rate.to_string()),
        ])
    }

    /// Batch gradient descent on standardized features
    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<TrainedModel> {
        check_shapes(x, y)?;
        let n_samples = x.nrows() as f64;

        let scaler = Standardizer::fit(x);
        let xs = scaler.transform(x)?;

        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let predictions = Self::sigmoid(&(xs.dot(&weights) + bias));
            let errors = &predictions - y;
            let dw = (xs.t().dot(&errors) / n_samples) + (self.alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * dw;
            bias -= self.learning_rate * db;
        }

        Ok(TrainedModel::LogisticRegression(LogisticModel {
            scaler,
            coefficients: weights,
            intercept: bias,
        }))
    }
}

/// Fitted logistic regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub scaler: Standardizer,
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    /// Probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let xs = self.scaler.transform(x)?;
        Ok(LogisticRegression::sigmoid(&(xs.dot(&self.coefficients) + self.intercept)))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Accuracy
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        check_shapes(x, y)?;
        let y_pred = self.predict(x)?;
        let correct = y_pred
            .iter()
            .zip(y.iter())
            .filter(|(pred, actual)| (*pred - *actual).abs() < 0.5)
            .count();
        Ok(correct as f64 / y.len() as f64)
    }
}

/// Ordinary least squares with an optional ridge penalty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// L2 penalty; 0 is plain OLS
    pub alpha: f64,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self { alpha: 0.0 }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

impl Estimator for LinearRegression {
    fn name(&self) -> &'static str {
        "linear_regression"
    }

    fn task(&self) -> TaskType {
        TaskType::Regression
    }

    fn hyperparameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("alpha".to_string(), self.alpha.to_string())])
    }

    /// Normal equations on standardized features; the intercept is the label mean
    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<TrainedModel> {
        check_shapes(x, y)?;

        let scaler = Standardizer::fit(x);
        let xs = scaler.transform(x)?;
        let intercept = y.mean().unwrap_or(0.0);
        let centered = y - intercept;

        let mut xtx = xs.t().dot(&xs);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += self.alpha.max(1e-10);
        }
        let xty = xs.t().dot(&centered);

        let coefficients = solve_linear_system(&xtx, &xty).ok_or_else(|| {
            MemoryError::InsufficientData("feature matrix is singular".to_string())
        })?;

        Ok(TrainedModel::LinearRegression(LinearModel {
            scaler,
            coefficients,
            intercept,
        }))
    }
}

/// Fitted linear regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub scaler: Standardizer,
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl LinearModel {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let xs = self.scaler.transform(x)?;
        Ok(xs.dot(&self.coefficients) + self.intercept)
    }

    /// Coefficient of determination
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        check_shapes(x, y)?;
        let y_pred = self.predict(x)?;

        let y_mean = y.mean().unwrap_or(0.0);
        let ss_res = (&y_pred - y).mapv(|v| v * v).sum();
        let ss_tot = y.mapv(|v| (v - y_mean) * (v - y_mean)).sum();

        if ss_tot == 0.0 {
            return Ok(1.0);
        }
        Ok(1.0 - ss_res / ss_tot)
    }
}
