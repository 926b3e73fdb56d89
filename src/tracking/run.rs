//! Training run records

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a closed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// A run that is still collecting parameters and metrics.
///
/// Closing it with [`ActiveRun::finish`] or [`ActiveRun::fail`] consumes the
/// value, so a closed [`TrainingRun`] can never be changed again.
#[derive(Debug)]
pub struct ActiveRun {
    run: TrainingRun,
}

impl ActiveRun {
    pub fn start(run_name: impl Into<String>) -> Self {
        Self {
            run: TrainingRun {
                run_id: uuid::Uuid::new_v4().to_string(),
                run_name: run_name.into(),
                started_at: Utc::now(),
                ended_at: None,
                params: BTreeMap::new(),
                metrics: BTreeMap::new(),
                status: RunStatus::Running,
                failure: None,
            },
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run.run_id
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl ToString) {
        self.run.params.insert(key.into(), value.to_string());
    }

    pub fn log_params(&mut self, params: BTreeMap<String, String>) {
        self.run.params.extend(params);
    }

    pub fn log_metric(&mut self, name: impl Into<String>, value: f64) {
        self.run.metrics.insert(name.into(), value);
    }

    pub fn finish(mut self) -> TrainingRun {
        self.run.ended_at = Some(Utc::now());
        self.run.status = RunStatus::Finished;
        self.run
    }

    pub fn fail(mut self, reason: impl Into<String>) -> TrainingRun {
        self.run.ended_at = Some(Utc::now());
        self.run.status = RunStatus::Failed;
        self.run.failure = Some(reason.into());
        self.run
    }
}

/// Closed record of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRun {
    run_id: String,
    run_name: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    params: BTreeMap<String, String>,
    metrics: BTreeMap<String, f64>,
    status: RunStatus,
    failure: Option<String>,
}

impl TrainingRun {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Run duration in seconds
    pub fn duration_secs(&self) -> f64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_run() {
        let mut active = ActiveRun::start("upload:houses.csv");
        active.log_param("estimator", "logistic_regression");
        active.log_metric("accuracy", 0.95);
        let id = active.run_id().to_string();

        let run = active.finish();
        assert_eq!(run.run_id(), id);
        assert_eq!(run.status(), RunStatus::Finished);
        assert_eq!(run.metric("accuracy"), Some(0.95));
        assert_eq!(run.params()["estimator"], "logistic_regression");
        assert!(run.ended_at().is_some());
        assert!(run.duration_secs() >= 0.0);
    }

    #[test]
    fn test_failed_run() {
        let run = ActiveRun::start("retrain").fail("registry unreachable");
        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.failure(), Some("registry unreachable"));
        assert!(run.metrics().is_empty());
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = ActiveRun::start("a");
        let b = ActiveRun::start("b");
        assert_ne!(a.run_id(), b.run_id());
    }
}
