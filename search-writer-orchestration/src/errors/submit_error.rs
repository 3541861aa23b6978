//! Submission error types.

use thiserror::Error;

/// Errors returned when submitting work to an orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The orchestrator no longer accepts new work because it was stopped
    /// or is shutting down.
    #[error("Orchestrator is closed to new submissions")]
    Closed,
}
