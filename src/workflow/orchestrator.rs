//! Workflow orchestrator

use std::sync::Arc;

use tracing::{error, info, warn};

use super::{RunFailure, RunSummary, WorkflowOutcome, WorkflowState};
use crate::aggregation::{MemoryAggregator, MemorySet};
use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use crate::registry::{LocalRegistry, RegistryStore, VersionRegistry};
use crate::storage::{LocalStore, ObjectStore};
use crate::tracking::{ActiveRun, TrainingRun};
use crate::training::{Estimator, LogisticRegression, TaskType, Trainer};
use crate::validation::{parse_csv, validate, DatasetSchema};

/// A dataset submitted by a user
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Tracks the current state of one run and reports every change
struct Progress<'a> {
    state: WorkflowState,
    observer: &'a dyn Fn(&WorkflowState),
}

impl<'a> Progress<'a> {
    fn new(observer: &'a dyn Fn(&WorkflowState)) -> Self {
        observer(&WorkflowState::Idle);
        Self {
            state: WorkflowState::Idle,
            observer,
        }
    }

    fn enter(&mut self, next: WorkflowState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        info!(from = %self.state, to = %next, "Workflow stage");
        self.state = next;
        (self.observer)(&self.state);
    }
}

/// Runs validation, aggregation, training and registration for each upload
pub struct Workflow {
    store: Arc<dyn ObjectStore>,
    aggregator: MemoryAggregator,
    trainer: Trainer,
    registry: VersionRegistry,
    schema: DatasetSchema,
    config: MemoryConfig,
}

impl Workflow {
    pub fn new(
        config: MemoryConfig,
        store: Arc<dyn ObjectStore>,
        registry_store: Arc<dyn RegistryStore>,
        estimator: Arc<dyn Estimator>,
    ) -> Result<Self> {
        config.validate()?;
        let schema = DatasetSchema::from_config(&config);
        Ok(Self {
            aggregator: MemoryAggregator::new(
                Arc::clone(&store),
                schema.clone(),
                config.uploads_prefix.clone(),
            ),
            trainer: Trainer::new(estimator, schema.clone()),
            registry: VersionRegistry::new(registry_store, config.model_name.clone()),
            store,
            schema,
            config,
        })
    }

    /// Local object store, local registry and logistic regression
    pub fn from_config(config: MemoryConfig) -> Result<Self> {
        let store = Arc::new(LocalStore::open(&config.store_dir)?);
        let registry = Arc::new(LocalRegistry::open(&config.registry_dir)?);
        Self::new(config, store, registry, Arc::new(LogisticRegression::new()))
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub fn run(&self, upload: Upload) -> WorkflowOutcome {
        self.run_with_observer(upload, &|_| {})
    }

    /// Run the full upload workflow, calling `observer` on every state change
    pub fn run_with_observer(&self, upload: Upload, observer: &dyn Fn(&WorkflowState)) -> WorkflowOutcome {
        let mut progress = Progress::new(observer);
        info!(dataset = %upload.name, bytes = upload.bytes.len(), "Upload received");
        let result = self.process_upload(&upload, &mut progress);
        self.finish(result, progress)
    }

    /// Retrain on the stored history alone, without a new upload
    pub fn retrain(&self) -> WorkflowOutcome {
        self.retrain_with_observer(&|_| {})
    }

    pub fn retrain_with_observer(&self, observer: &dyn Fn(&WorkflowState)) -> WorkflowOutcome {
        let mut progress = Progress::new(observer);
        info!(prefix = %self.config.uploads_prefix, "Retrain requested");
        let result = self.process_retrain(&mut progress);
        self.finish(result, progress)
    }

    fn process_upload(&self, upload: &Upload, progress: &mut Progress<'_>) -> Result<RunSummary> {
        progress.enter(WorkflowState::Validating);
        check_dataset_name(&upload.name)?;
        let frame = parse_csv(&upload.bytes)?;
        let dataset = validate(frame, &upload.name, &self.schema)?;
        info!(dataset = %upload.name, rows = dataset.rows(), "Dataset validated");

        // Only validated uploads reach storage
        self.store
            .write(&self.config.upload_key(&upload.name), &upload.bytes)?;

        progress.enter(WorkflowState::Aggregating);
        let memory = self.aggregator.aggregate(&dataset).map_err(into_system)?;

        let mut summary = self.train_and_register(memory, &format!("upload:{}", upload.name), progress)?;
        summary.dataset = Some(upload.name.clone());
        Ok(summary)
    }

    fn process_retrain(&self, progress: &mut Progress<'_>) -> Result<RunSummary> {
        progress.enter(WorkflowState::Aggregating);
        let memory = self.aggregator.aggregate_stored().map_err(into_system)?;
        self.train_and_register(memory, "retrain", progress)
    }

    fn train_and_register(
        &self,
        memory: MemorySet,
        run_name: &str,
        progress: &mut Progress<'_>,
    ) -> Result<RunSummary> {
        progress.enter(WorkflowState::Training);
        let mut run = ActiveRun::start(run_name);
        run.log_param("estimator", self.trainer.estimator().name());
        run.log_params(self.trainer.estimator().hyperparameters());
        run.log_param("features", self.schema.features.join(","));
        run.log_param("label", &self.schema.label);
        run.log_param("sources", memory.sources.join(","));

        match self.train_tracked(&memory, &mut run, progress) {
            Ok((version, promoted, accuracy, trained_rows)) => {
                let run_id = run.run_id().to_string();
                self.close_run(run.finish());
                Ok(RunSummary {
                    dataset: None,
                    accuracy,
                    rows: memory.rows(),
                    trained_rows,
                    version,
                    promoted,
                    run_id,
                    sources: memory.sources,
                    skipped: memory.skipped,
                })
            }
            Err(e) => {
                self.close_run(run.fail(e.to_string()));
                Err(e)
            }
        }
    }

    fn train_tracked(
        &self,
        memory: &MemorySet,
        run: &mut ActiveRun,
        progress: &mut Progress<'_>,
    ) -> Result<(u64, bool, f64, usize)> {
        let outcome = self.trainer.train(memory)?;
        let metric_name = match self.trainer.estimator().task() {
            TaskType::BinaryClassification => "accuracy",
            TaskType::Regression => "r2",
        };
        run.log_metric(metric_name, outcome.metric);
        run.log_metric("rows", memory.rows() as f64);
        run.log_metric("trained_rows", outcome.rows as f64);
        run.log_metric("training_time_secs", outcome.training_time_secs);

        progress.enter(WorkflowState::Registering);
        let version = self
            .registry
            .register(&outcome.artifact, outcome.metric, run)
            .map_err(into_system)?;
        run.log_param("version", version);

        let promoted = if self.config.promote_on_success {
            self.registry.promote(version).map_err(into_system)?;
            true
        } else {
            false
        };

        Ok((version, promoted, outcome.metric, outcome.rows))
    }

    /// Persist a closed run; a tracking failure never changes the outcome
    fn close_run(&self, run: TrainingRun) {
        if let Err(e) = self.registry.record_run(&run) {
            warn!(run_id = %run.run_id(), status = ?run.status(), error = %e, "Failed to record training run");
        }
    }

    fn finish(&self, result: Result<RunSummary>, mut progress: Progress<'_>) -> WorkflowOutcome {
        match result {
            Ok(summary) => {
                progress.enter(WorkflowState::Done);
                info!(
                    version = summary.version,
                    rows = summary.rows,
                    accuracy = summary.accuracy,
                    promoted = summary.promoted,
                    skipped = summary.skipped.len(),
                    "Workflow finished"
                );
                WorkflowOutcome::Done(summary)
            }
            Err(e) => {
                let stage = progress.state.clone();
                error!(stage = %stage, kind = %e.kind(), error = %e, "Workflow failed");
                let failure = RunFailure {
                    stage,
                    kind: e.kind(),
                    message: e.public_message(),
                };
                progress.enter(WorkflowState::Failed(failure.message.clone()));
                WorkflowOutcome::Failed(failure)
            }
        }
    }
}

/// Dataset names become a single storage key segment
fn check_dataset_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MemoryError::Data("No selected file".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(MemoryError::Data(format!("Invalid dataset name: '{}'", name)));
    }
    Ok(())
}

/// Frame errors past validation come from the pipeline, not the uploader
fn into_system(err: MemoryError) -> MemoryError {
    match err {
        MemoryError::Data(detail) => MemoryError::System(detail),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::{InMemoryRegistry, Stage};
    use crate::storage::InMemoryStore;
    use parking_lot::Mutex;

    const GOOD: &str = "id,sqft,is_expensive\n1,800,0\n2,1200,0\n3,3000,1\n4,4200,1\n";

    fn workflow() -> (Workflow, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let config = MemoryConfig::default()
            .with_uploads_prefix("uploads/")
            .with_model_name("housing")
            .with_feature_columns(vec!["sqft".to_string()])
            .with_label_column("is_expensive")
            .with_promote_on_success(true);
        let workflow = Workflow::new(
            config,
            store.clone(),
            Arc::new(InMemoryRegistry::new()),
            Arc::new(LogisticRegression::new()),
        )
        .unwrap();
        (workflow, store)
    }

    #[test]
    fn test_successful_run_visits_every_stage() {
        let (workflow, store) = workflow();
        let states = Mutex::new(Vec::new());
        let outcome = workflow.run_with_observer(Upload::new("a.csv", GOOD), &|s| {
            states.lock().push(s.clone())
        });

        assert_eq!(outcome.status_code(), 200);
        assert_eq!(
            states.into_inner(),
            vec![
                WorkflowState::Idle,
                WorkflowState::Validating,
                WorkflowState::Aggregating,
                WorkflowState::Training,
                WorkflowState::Registering,
                WorkflowState::Done,
            ]
        );
        assert!(store.exists("uploads/a.csv").unwrap());

        let summary = outcome.summary().unwrap();
        assert_eq!(summary.version, 1);
        assert_eq!(summary.rows, 4);
        assert!(summary.promoted);
        assert_eq!(workflow.registry().production_version().unwrap().version, 1);
    }

    #[test]
    fn test_invalid_upload_is_not_stored() {
        let (workflow, store) = workflow();
        let outcome = workflow.run(Upload::new("bad.csv", "id,sqft,is_expensive\n1,5a0,1\n"));

        assert_eq!(outcome.status_code(), 400);
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.stage, WorkflowState::Validating);
        assert_eq!(failure.kind, ErrorKind::Format);
        assert!(failure.message.contains("'a'"));
        assert!(failure.message.contains("line 2"));
        assert!(store.is_empty());
        assert!(workflow.registry().history().unwrap().is_empty());
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let (workflow, store) = workflow();
        let outcome = workflow.run(Upload::new("x.csv", "id,sqft\n1,800\n"));
        assert_eq!(outcome.failure().unwrap().kind, ErrorKind::Schema);
        assert!(store.is_empty());
    }

    #[test]
    fn test_path_like_names_rejected() {
        let (workflow, _) = workflow();
        for name in ["", "../a.csv", "dir/a.csv"] {
            let outcome = workflow.run(Upload::new(name, GOOD));
            assert_eq!(outcome.status_code(), 400, "name {:?}", name);
            assert_eq!(outcome.failure().unwrap().kind, ErrorKind::Data);
        }
    }

    #[test]
    fn test_missing_file_is_data_error() {
        let (workflow, store) = workflow();
        let outcome = workflow.run(Upload::new("  ", GOOD));
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::Data);
        assert_eq!(failure.kind.to_string(), "DataError");
        assert_eq!(failure.message, "Data error: No selected file");
        assert!(store.is_empty());
    }

    #[test]
    fn test_summary_separates_memory_and_fitted_rows() {
        let (workflow, _) = workflow();
        let outcome = workflow.run(Upload::new(
            "gaps.csv",
            "sqft,is_expensive\n800,0\n,1\n3000,1\n1.2.3,0\n",
        ));
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.trained_rows, 2);
        assert!(outcome.response().message.ends_with("trained on 4 rows."));
    }

    #[test]
    fn test_single_class_fails_in_training() {
        let (workflow, store) = workflow();
        let outcome = workflow.run(Upload::new("cheap.csv", "sqft,is_expensive\n800,0\n900,0\n"));

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.stage, WorkflowState::Training);
        assert_eq!(failure.kind, ErrorKind::InsufficientData);
        // Valid data stays stored even when training cannot proceed
        assert!(store.exists("uploads/cheap.csv").unwrap());
        assert!(workflow.registry().history().unwrap().is_empty());
    }

    #[test]
    fn test_run_is_recorded_with_version() {
        let (workflow, _) = workflow();
        let outcome = workflow.run(Upload::new("a.csv", GOOD));
        let summary = outcome.summary().unwrap();

        let run = workflow.registry().run(&summary.run_id).unwrap();
        assert_eq!(run.params().get("version").map(String::as_str), Some("1"));
        assert_eq!(run.metric("accuracy"), Some(summary.accuracy));
        assert_eq!(run.metric("rows"), Some(4.0));
    }

    #[test]
    fn test_same_name_replaces_history() {
        let (workflow, _) = workflow();
        workflow.run(Upload::new("a.csv", GOOD));
        let outcome = workflow.run(Upload::new("a.csv", GOOD));

        let summary = outcome.summary().unwrap();
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.version, 2);
        assert_eq!(summary.sources, vec!["a.csv".to_string()]);

        let history = workflow.registry().history().unwrap();
        assert_eq!(history[0].stage, Stage::Production);
        assert_eq!(history[1].stage, Stage::Archived);
    }

    #[test]
    fn test_retrain_needs_stored_data() {
        let (workflow, _) = workflow();
        let outcome = workflow.retrain();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.stage, WorkflowState::Aggregating);
        assert_eq!(failure.kind, ErrorKind::InsufficientData);

        workflow.run(Upload::new("a.csv", GOOD));
        let outcome = workflow.retrain();
        assert!(outcome.is_done());
        assert_eq!(outcome.summary().unwrap().dataset, None);
        assert_eq!(outcome.summary().unwrap().version, 2);
    }
}
