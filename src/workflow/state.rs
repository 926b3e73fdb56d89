//! Workflow states

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason")]
pub enum WorkflowState {
    Idle,
    Validating,
    Aggregating,
    Training,
    Registering,
    Done,
    Failed(String),
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Failed(_))
    }

    /// Position in the happy path; terminal states have none
    fn rank(&self) -> Option<u8> {
        match self {
            WorkflowState::Idle => Some(0),
            WorkflowState::Validating => Some(1),
            WorkflowState::Aggregating => Some(2),
            WorkflowState::Training => Some(3),
            WorkflowState::Registering => Some(4),
            WorkflowState::Done | WorkflowState::Failed(_) => None,
        }
    }

    /// Whether a run may move from `self` to `next`.
    ///
    /// Stages only move forward (a retrain skips `Validating`), any
    /// non-terminal state may fail, and terminal states are final.
    pub fn can_transition_to(&self, next: &WorkflowState) -> bool {
        match (self.rank(), next) {
            (None, _) => false,
            (Some(_), WorkflowState::Failed(_)) => true,
            (Some(4), WorkflowState::Done) => true,
            (Some(_), WorkflowState::Done) => false,
            (Some(current), _) => next.rank().is_some_and(|n| n > current),
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Idle => f.write_str("Idle"),
            WorkflowState::Validating => f.write_str("Validating"),
            WorkflowState::Aggregating => f.write_str("Aggregating"),
            WorkflowState::Training => f.write_str("Training"),
            WorkflowState::Registering => f.write_str("Registering"),
            WorkflowState::Done => f.write_str("Done"),
            WorkflowState::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}
