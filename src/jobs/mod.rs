//! Background training jobs
//!
//! Uploads are accepted immediately and processed on the blocking pool, one
//! workflow at a time. Callers poll [`TrainingQueue::status`] or await the
//! returned [`JobHandle`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{MemoryError, Result};
use crate::workflow::{Upload, Workflow, WorkflowOutcome, WorkflowState};

/// Job status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running { state: WorkflowState },
    Completed { version: u64, accuracy: f64, rows: usize },
    Failed { stage: WorkflowState, error: String },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }
}

impl From<&WorkflowOutcome> for JobStatus {
    fn from(outcome: &WorkflowOutcome) -> Self {
        match outcome {
            WorkflowOutcome::Done(s) => JobStatus::Completed {
                version: s.version,
                accuracy: s.accuracy,
                rows: s.rows,
            },
            WorkflowOutcome::Failed(f) => JobStatus::Failed {
                stage: f.stage.clone(),
                error: f.message.clone(),
            },
        }
    }
}

/// Training job information
#[derive(Debug, Clone, Serialize)]
pub struct TrainingJob {
    pub id: String,
    /// Uploaded dataset; `None` for a retrain
    pub dataset: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Handle to a submitted job
pub struct JobHandle {
    pub id: String,
    handle: JoinHandle<WorkflowOutcome>,
}

impl JobHandle {
    /// Wait for the job to finish
    pub async fn wait(self) -> Result<WorkflowOutcome> {
        self.handle
            .await
            .map_err(|e| MemoryError::system("Training job aborted", e))
    }
}

type JobMap = Arc<RwLock<HashMap<String, TrainingJob>>>;

/// Runs workflows in the background and tracks their status
#[derive(Clone)]
pub struct TrainingQueue {
    workflow: Arc<Workflow>,
    jobs: JobMap,
    run_lock: Arc<Mutex<()>>,
}

impl TrainingQueue {
    pub fn new(workflow: Arc<Workflow>) -> Self {
        Self {
            workflow,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn workflow(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    /// Queue an upload. Must be called from within a tokio runtime.
    pub fn submit(&self, upload: Upload) -> JobHandle {
        let dataset = Some(upload.name.clone());
        self.spawn(dataset, move |workflow, observer| {
            workflow.run_with_observer(upload, observer)
        })
    }

    /// Queue a retrain over stored datasets
    pub fn submit_retrain(&self) -> JobHandle {
        self.spawn(None, |workflow, observer| workflow.retrain_with_observer(observer))
    }

    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().get(job_id).map(|job| job.status.clone())
    }

    pub fn job(&self, job_id: &str) -> Option<TrainingJob> {
        self.jobs.read().get(job_id).cloned()
    }

    /// All jobs, oldest first
    pub fn jobs(&self) -> Vec<TrainingJob> {
        let mut jobs: Vec<TrainingJob> = self.jobs.read().values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    fn spawn<F>(&self, dataset: Option<String>, work: F) -> JobHandle
    where
        F: FnOnce(&Workflow, &dyn Fn(&WorkflowState)) -> WorkflowOutcome + Send + 'static,
    {
        let job_id = uuid::Uuid::new_v4().to_string();
        let job = TrainingJob {
            id: job_id.clone(),
            dataset,
            status: JobStatus::Pending,
            created_at: Utc::now(),
        };
        self.jobs.write().insert(job_id.clone(), job);
        info!(job_id = %job_id, "Training job queued");

        let workflow = Arc::clone(&self.workflow);
        let jobs = Arc::clone(&self.jobs);
        let run_lock = Arc::clone(&self.run_lock);
        let id = job_id.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let _guard = run_lock.lock();
            let observer: &dyn Fn(&WorkflowState) = &|state: &WorkflowState| {
                if !state.is_terminal() {
                    set_status(&jobs, &id, JobStatus::Running { state: state.clone() });
                }
            };
            let outcome = work(workflow.as_ref(), observer);
            set_status(&jobs, &id, JobStatus::from(&outcome));
            info!(job_id = %id, status_code = outcome.status_code(), "Training job finished");
            outcome
        });

        JobHandle { id: job_id, handle }
    }
}

fn set_status(jobs: &JobMap, job_id: &str, status: JobStatus) {
    if let Some(job) = jobs.write().get_mut(job_id) {
        job.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::registry::InMemoryRegistry;
    use crate::storage::InMemoryStore;
    use crate::training::LogisticRegression;

    fn queue() -> TrainingQueue {
        let config = MemoryConfig::default()
            .with_uploads_prefix("uploads/")
            .with_model_name("housing")
            .with_feature_columns(vec!["sqft".to_string()])
            .with_label_column("is_expensive")
            .with_promote_on_success(true);
        let workflow = Workflow::new(
            config,
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryRegistry::new()),
            Arc::new(LogisticRegression::new()),
        )
        .unwrap();
        TrainingQueue::new(Arc::new(workflow))
    }

    #[tokio::test]
    async fn test_job_completes() {
        let queue = queue();
        let handle = queue.submit(Upload::new(
            "a.csv",
            "sqft,is_expensive\n800,0\n1000,0\n3000,1\n4000,1\n",
        ));
        let id = handle.id.clone();
        let outcome = handle.wait().await.unwrap();

        assert!(outcome.is_done());
        assert!(matches!(
            queue.status(&id),
            Some(JobStatus::Completed { version: 1, rows: 4, .. })
        ));
        assert_eq!(queue.job(&id).unwrap().dataset.as_deref(), Some("a.csv"));
    }

    #[tokio::test]
    async fn test_job_failure_is_reported() {
        let queue = queue();
        let handle = queue.submit(Upload::new("bad.csv", "sqft,is_expensive\nabc,1\n"));
        let id = handle.id.clone();
        handle.wait().await.unwrap();

        match queue.status(&id) {
            Some(JobStatus::Failed { stage, error }) => {
                assert_eq!(stage, WorkflowState::Validating);
                assert!(error.contains("line 2"));
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_queued_jobs_run_sequentially() {
        let queue = queue();
        let csv = "sqft,is_expensive\n800,0\n1000,0\n3000,1\n4000,1\n";
        let handles: Vec<JobHandle> = (0..4)
            .map(|i| queue.submit(Upload::new(format!("part{}.csv", i), csv)))
            .collect();

        let mut versions = Vec::new();
        for handle in handles {
            versions.push(handle.wait().await.unwrap().summary().unwrap().version);
        }
        versions.sort_unstable();
        assert_eq!(versions, vec![1, 2, 3, 4]);
        assert_eq!(queue.jobs().len(), 4);
        assert!(queue.jobs().iter().all(|job| job.status.is_finished()));
    }

    #[test]
    fn test_unknown_job() {
        assert!(queue().status("missing").is_none());
    }
}
