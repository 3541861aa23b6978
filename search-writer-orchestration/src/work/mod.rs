//! The work model: the units of write work the engine orchestrates.
//!
//! Callers implement [`BulkableWork`] for operations the store's bulk API
//! supports (index, delete, update) and [`NonBulkableWork`] for everything
//! else (flushes, index administration). The [`Work`] enum is the submission
//! type: it routes each work down the bulkable or non-bulkable path without
//! the engine ever guessing at a work's capabilities.

mod bulk;
mod refresh;

pub(crate) use bulk::BulkWork;
pub(crate) use refresh::RefreshWork;

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::WorkExecutionContext;
use crate::errors::WorkError;
use search_writer_shared::{RefreshStrategy, WorkInfo, WorkOutcome};
use search_writer_transport::{BulkAction, BulkItem};

/// The result a single unit of work completes with.
pub type WorkResult = Result<WorkOutcome, WorkError>;

/// A unit of work that must be executed as its own request.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine executes works from
/// background tasks and shares them behind `Arc`.
#[async_trait]
pub trait NonBulkableWork: Send + Sync {
    /// Execute the work against the store reachable through `context`.
    ///
    /// Works with [`RefreshStrategy::Immediate`] semantics must call
    /// [`WorkExecutionContext::register_index_to_refresh`] on success so the
    /// engine can refresh the touched index once the changeset completes.
    async fn execute(&self, context: &mut dyn WorkExecutionContext) -> WorkResult;

    /// Descriptive metadata for logs and failure reports.
    fn info(&self) -> WorkInfo;

    /// Optional routing key, carried through for diagnostics.
    fn queuing_key(&self) -> Option<&str> {
        None
    }
}

/// A unit of work that can share a bulk request with other works.
///
/// A bulkable work leads a double life: inside a bulk it contributes one
/// [`BulkAction`] and later interprets its positional [`BulkItem`]; outside
/// a bulk (when a bulk would be too small to be worth it) the engine calls
/// [`BulkableWork::execute`] and the work runs as a single request.
#[async_trait]
pub trait BulkableWork: Send + Sync {
    /// Execute the work as a single request, outside any bulk.
    async fn execute(&self, context: &mut dyn WorkExecutionContext) -> WorkResult;

    /// The refresh strategy this work requires. Works only share a bulk
    /// with works of the same strategy.
    fn refresh_strategy(&self) -> RefreshStrategy;

    /// The action this work contributes to a bulk request.
    fn bulk_action(&self) -> BulkAction;

    /// Interpret this work's item of a completed bulk response.
    ///
    /// Called only when the bulk request as a whole succeeded. The item may
    /// still report a per-action failure; implementations turn that into a
    /// [`WorkError::Backend`]. On success, works with
    /// [`RefreshStrategy::Immediate`] must register their index on the
    /// context, exactly as in [`BulkableWork::execute`].
    fn handle_bulk_item(
        &self,
        context: &mut dyn WorkExecutionContext,
        item: &BulkItem,
    ) -> WorkResult;

    /// Descriptive metadata for logs and failure reports.
    fn info(&self) -> WorkInfo;

    /// Optional routing key, carried through for diagnostics.
    fn queuing_key(&self) -> Option<&str> {
        None
    }
}

/// A unit of work submitted to an orchestrator.
///
/// The two variants are the engine's only routing signal: bulkable works
/// flow through the bulker and may share requests, non-bulkable works always
/// execute on their own.
#[derive(Clone)]
pub enum Work {
    /// A work that must execute as its own request.
    NonBulkable(Arc<dyn NonBulkableWork>),
    /// A work that may share a bulk request.
    Bulkable(Arc<dyn BulkableWork>),
}

impl Work {
    /// Wrap a non-bulkable work for submission.
    pub fn non_bulkable(work: impl NonBulkableWork + 'static) -> Self {
        Self::NonBulkable(Arc::new(work))
    }

    /// Wrap a bulkable work for submission.
    pub fn bulkable(work: impl BulkableWork + 'static) -> Self {
        Self::Bulkable(Arc::new(work))
    }

    /// Descriptive metadata for logs and failure reports.
    pub fn info(&self) -> WorkInfo {
        match self {
            Self::NonBulkable(work) => work.info(),
            Self::Bulkable(work) => work.info(),
        }
    }

    /// The routing key the work was submitted under, if any.
    pub fn queuing_key(&self) -> Option<&str> {
        match self {
            Self::NonBulkable(work) => work.queuing_key(),
            Self::Bulkable(work) => work.queuing_key(),
        }
    }

    /// Whether this work may share a bulk request.
    pub fn is_bulkable(&self) -> bool {
        matches!(self, Self::Bulkable(_))
    }
}

impl std::fmt::Debug for Work {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonBulkable(work) => write!(f, "Work::NonBulkable({})", work.info()),
            Self::Bulkable(work) => write!(f, "Work::Bulkable({})", work.info()),
        }
    }
}

/// Adapter that runs a bulkable work as a plain single request.
///
/// Used for single-work submissions that bypass the bulker: the work keeps
/// its own execution semantics but is appended to the sequence as a
/// non-bulkable step.
pub(crate) struct UnbulkedWork {
    inner: Arc<dyn BulkableWork>,
}

impl UnbulkedWork {
    pub(crate) fn new(inner: Arc<dyn BulkableWork>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl NonBulkableWork for UnbulkedWork {
    async fn execute(&self, context: &mut dyn WorkExecutionContext) -> WorkResult {
        self.inner.execute(context).await
    }

    fn info(&self) -> WorkInfo {
        self.inner.info()
    }

    fn queuing_key(&self) -> Option<&str> {
        self.inner.queuing_key()
    }
}
