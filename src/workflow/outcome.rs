//! Run results and their HTTP-boundary shape

use serde::Serialize;

use super::WorkflowState;
use crate::aggregation::SkippedDataset;
use crate::error::ErrorKind;

/// A run that reached `Done`
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Uploaded dataset name; `None` for a retrain over stored data
    pub dataset: Option<String>,
    /// In-sample metric of the new version
    pub accuracy: f64,
    /// Rows in the memory set
    pub rows: usize,
    /// Memory-set rows the model was fitted on
    pub trained_rows: usize,
    pub version: u64,
    pub promoted: bool,
    pub run_id: String,
    pub sources: Vec<String>,
    pub skipped: Vec<SkippedDataset>,
}

/// A run that ended in `Failed`
#[derive(Debug, Clone)]
pub struct RunFailure {
    /// Stage that was active when the error occurred
    pub stage: WorkflowState,
    pub kind: ErrorKind,
    /// User-safe message; exact for data errors, generic for system errors
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum WorkflowOutcome {
    Done(RunSummary),
    Failed(RunFailure),
}

/// JSON body returned to an uploader
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl WorkflowOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, WorkflowOutcome::Done(_))
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            WorkflowOutcome::Done(summary) => Some(summary),
            WorkflowOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            WorkflowOutcome::Done(_) => None,
            WorkflowOutcome::Failed(failure) => Some(failure),
        }
    }

    /// 200 on success, 400 for data problems, 500 for system failures
    pub fn status_code(&self) -> u16 {
        match self {
            WorkflowOutcome::Done(_) => 200,
            WorkflowOutcome::Failed(f) if f.kind == ErrorKind::System => 500,
            WorkflowOutcome::Failed(_) => 400,
        }
    }

    pub fn response(&self) -> UploadResponse {
        match self {
            WorkflowOutcome::Done(s) => {
                let subject = match &s.dataset {
                    Some(name) => format!("'{}' added to Collective Memory.", name),
                    None => "Collective Memory retrained.".to_string(),
                };
                UploadResponse {
                    status: "success",
                    message: format!("{} Model v{} trained on {} rows.", subject, s.version, s.rows),
                    accuracy: Some(s.accuracy),
                }
            }
            WorkflowOutcome::Failed(f) => UploadResponse {
                status: "error",
                message: f.message.clone(),
                accuracy: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(kind: ErrorKind) -> WorkflowOutcome {
        WorkflowOutcome::Failed(RunFailure {
            stage: WorkflowState::Validating,
            kind,
            message: "bad".to_string(),
        })
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(failure(ErrorKind::Format).status_code(), 400);
        assert_eq!(failure(ErrorKind::Schema).status_code(), 400);
        assert_eq!(failure(ErrorKind::System).status_code(), 500);
    }

    #[test]
    fn test_success_response_serializes_accuracy() {
        let outcome = WorkflowOutcome::Done(RunSummary {
            dataset: Some("houses.csv".to_string()),
            accuracy: 0.9,
            rows: 12,
            trained_rows: 12,
            version: 4,
            promoted: true,
            run_id: "r".to_string(),
            sources: vec!["houses.csv".to_string()],
            skipped: Vec::new(),
        });
        assert_eq!(outcome.status_code(), 200);

        let json = serde_json::to_value(outcome.response()).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["accuracy"], 0.9);
        assert!(json["message"].as_str().unwrap().contains("v4"));
    }

    #[test]
    fn test_error_response_omits_accuracy() {
        let json = serde_json::to_value(failure(ErrorKind::Format).response()).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("accuracy").is_none());
    }
}
