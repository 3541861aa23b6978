//! # Search Writer Orchestration
//!
//! This crate turns submitted index mutations into ordered sequences of
//! search backend requests, grouping bulkable works into `_bulk` calls and
//! coalescing refreshes along the way.
//!
//! ## Architecture
//!
//! Submissions flow through four stages:
//!
//! 1. **Orchestrator**: Accepts changesets and chooses ordering
//! 2. **Aggregator**: Splits a changeset into bulks and standalone works
//! 3. **Sequence**: Executes the steps in order, skipping after a failure
//! 4. **Transport**: Carries the requests to the search backend
//!
//! Four orchestrators cover the ways callers submit:
//!
//! - [`SerialWorkOrchestrator`] runs changesets strictly one after another
//! - [`ParallelWorkOrchestrator`] runs changesets independently
//! - [`AccumulatingWorkOrchestrator`] holds works until told to execute
//! - [`BatchingWorkOrchestrator`] feeds a queue drained by a background
//!   consumer so bulks form across submissions

pub mod context;
pub mod errors;
pub mod failure;
pub mod orchestrator;
pub mod submission;
pub mod work;

mod aggregator;
mod bulker;
mod executor;
mod sequence;

#[cfg(test)]
mod test_support;

pub use context::{RefreshPolicy, WorkExecutionContext};
pub use errors::{SubmitError, WorkError};
pub use failure::{FailedWork, FailureHandler, FailureReport, LoggingFailureHandler};
pub use orchestrator::{
    AccumulatingWorkOrchestrator, BatchingConfig, BatchingSubmitter, BatchingWorkOrchestrator,
    ChangesetOrchestrator, OrchestratorConfig, OrderingPolicy, ParallelWorkOrchestrator,
    SerialWorkOrchestrator,
};
pub use submission::{ChangesetFuture, SubmittedChangeset, WorkResultFuture};
pub use work::{BulkableWork, NonBulkableWork, Work, WorkResult};
