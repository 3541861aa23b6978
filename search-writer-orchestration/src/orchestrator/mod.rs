//! Orchestrators: the submission front-ends of the engine.
//!
//! All orchestrators share the same machinery underneath (sequence builder,
//! bulker, aggregator) and differ in where and when work executes:
//!
//! - [`SerialWorkOrchestrator`]: each changeset becomes one sequence,
//!   sequences run strictly one after another.
//! - [`ParallelWorkOrchestrator`]: each changeset becomes one sequence,
//!   sequences run independently.
//! - [`BatchingWorkOrchestrator`]: submissions from many tasks flow through
//!   a queue into a background consumer that batches them into shared
//!   sequences, bulking across submission boundaries.
//! - [`AccumulatingWorkOrchestrator`]: collects works without executing
//!   until the caller explicitly asks, for end-of-transaction flushes.

mod accumulating;
mod batching;
mod parallel;
mod processor;
mod serial;

pub use accumulating::AccumulatingWorkOrchestrator;
pub use batching::{BatchingConfig, BatchingSubmitter, BatchingWorkOrchestrator};
pub use parallel::ParallelWorkOrchestrator;
pub use serial::SerialWorkOrchestrator;

pub(crate) use processor::WorkProcessor;

use async_trait::async_trait;

use crate::context::RefreshPolicy;
use crate::errors::SubmitError;
use crate::submission::{SubmittedChangeset, WorkResultFuture};
use crate::work::Work;

/// Whether sequences built from successive changesets run one after another
/// or independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingPolicy {
    /// A sequence starts only after the previous one completed.
    #[default]
    Serial,
    /// Sequences run independently of each other.
    Parallel,
}

/// Configuration shared by all orchestrators.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Largest number of works in one bulk request.
    pub max_bulk_size: usize,
    /// Bulks smaller than this execute their works individually instead.
    pub min_bulk_size: usize,
    /// What to do with the refresh registrations works make.
    pub refresh: RefreshPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_bulk_size: 250,
            min_bulk_size: 2,
            refresh: RefreshPolicy::Track,
        }
    }
}

/// Common lifecycle and submission surface of every orchestrator.
///
/// # Lifecycle
///
/// [`start`](ChangesetOrchestrator::start) makes the orchestrator
/// operational (a no-op for orchestrators without background resources),
/// [`pre_stop`](ChangesetOrchestrator::pre_stop) closes submissions and
/// waits for in-flight work, and [`stop`](ChangesetOrchestrator::stop)
/// releases resources immediately. Works still queued at `stop` resolve
/// with [`WorkError::Abandoned`](crate::errors::WorkError::Abandoned)
/// rather than hanging their callers.
#[async_trait]
pub trait ChangesetOrchestrator: Send {
    /// Make the orchestrator operational. Idempotent.
    fn start(&mut self) {}

    /// Submit a changeset: an ordered list of works that execute together.
    ///
    /// Returns one result future per work plus a completion future for the
    /// changeset as a whole. Fails with [`SubmitError::Closed`] once the
    /// orchestrator is stopping.
    async fn submit(&mut self, works: Vec<Work>) -> Result<SubmittedChangeset, SubmitError>;

    /// Submit a single work outside any changeset.
    async fn submit_one(&mut self, work: Work) -> Result<WorkResultFuture, SubmitError>;

    /// Stop admitting new work and wait until everything in flight has
    /// completed.
    async fn pre_stop(&mut self);

    /// Release resources immediately. In-flight work is not waited for.
    /// Idempotent, and safe to call without a preceding `pre_stop`.
    fn stop(&mut self);
}
