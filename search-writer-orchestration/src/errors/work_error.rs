//! Work error types.
//!
//! This module defines the errors a unit of work can complete with. The
//! variants carry their causes behind `Arc` so that one underlying failure
//! can be reported to every work it affected, as well as to the failure
//! handler, without copying the cause around.

use std::sync::Arc;

use thiserror::Error;

use search_writer_transport::TransportError;

/// Errors that a unit of write work can complete with.
#[derive(Error, Debug, Clone)]
pub enum WorkError {
    /// The transport failed to execute the work's request.
    #[error("Transport error: {0}")]
    Transport(#[source] Arc<TransportError>),

    /// The store executed the request but reported the operation as failed.
    #[error("Store reported status {status}: {reason}")]
    Backend {
        /// HTTP-style status code for the failed operation.
        status: u16,
        /// Failure description extracted from the store's response.
        reason: String,
    },

    /// The work sat in a bulk request that failed as a whole, so its own
    /// outcome was never determined.
    #[error("Bulk request failed: {cause}")]
    BulkFailed {
        /// The error that failed the containing bulk.
        #[source]
        cause: Arc<WorkError>,
    },

    /// The work was never executed because an earlier work in the same
    /// changeset failed.
    #[error("Skipped because a previous work failed: {cause}")]
    Skipped {
        /// The failure that caused this work to be skipped.
        #[source]
        cause: Arc<WorkError>,
    },

    /// The orchestrator released the work without completing it, for
    /// example because it was stopped or reset.
    #[error("Abandoned before completion")]
    Abandoned,
}

impl WorkError {
    /// Create a transport error.
    pub fn transport(error: TransportError) -> Self {
        Self::Transport(Arc::new(error))
    }

    /// Create a backend error from a status code and reason.
    pub fn backend(status: u16, reason: impl Into<String>) -> Self {
        Self::Backend {
            status,
            reason: reason.into(),
        }
    }

    /// Create an error for a work whose containing bulk failed.
    pub fn bulk_failed(cause: Arc<WorkError>) -> Self {
        Self::BulkFailed { cause }
    }

    /// Create an error for a work skipped after an earlier failure.
    pub fn skipped(cause: Arc<WorkError>) -> Self {
        Self::Skipped { cause }
    }

    /// Whether this error means the work was never attempted.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_error_displays_its_cause() {
        let cause = Arc::new(WorkError::backend(429, "rejected"));
        let error = WorkError::skipped(cause);
        assert_eq!(
            error.to_string(),
            "Skipped because a previous work failed: Store reported status 429: rejected"
        );
        assert!(error.is_skipped());
    }

    #[test]
    fn bulk_failure_wraps_the_transport_cause() {
        let transport = WorkError::transport(TransportError::connection("refused"));
        let error = WorkError::bulk_failed(Arc::new(transport));
        assert!(matches!(error, WorkError::BulkFailed { .. }));
        assert!(!error.is_skipped());
    }

    #[test]
    fn errors_are_cloneable_for_fan_out() {
        let error = WorkError::backend(500, "boom");
        let copy = error.clone();
        assert_eq!(copy.to_string(), error.to_string());
    }
}
