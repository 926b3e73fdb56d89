//! Workflow Orchestration Module
//!
//! One upload event drives one run through
//! `Idle -> Validating -> Aggregating -> Training -> Registering -> Done`,
//! leaving for `Failed` from whichever stage errors. Nothing is retried.

mod orchestrator;
mod outcome;
mod state;

pub use orchestrator::{Upload, Workflow};
pub use outcome::{RunFailure, RunSummary, UploadResponse, WorkflowOutcome};
pub use state::WorkflowState;
