//! The refresh work the engine appends after a changeset.

use async_trait::async_trait;

use crate::context::WorkExecutionContext;
use crate::errors::WorkError;
use crate::work::{NonBulkableWork, WorkResult};
use search_writer_shared::{IndexName, WorkInfo, WorkOutcome};

/// Refreshes the indexes a changeset marked dirty.
///
/// Built internally once per sequence from the indexes collected on the
/// execution context, so a changeset touching the same index many times
/// costs a single refresh call.
pub(crate) struct RefreshWork {
    indexes: Vec<IndexName>,
}

impl RefreshWork {
    /// Create a refresh over the given indexes. Callers never pass an empty
    /// list; a sequence with nothing to refresh appends no refresh work.
    pub(crate) fn new(indexes: Vec<IndexName>) -> Self {
        Self { indexes }
    }
}

#[async_trait]
impl NonBulkableWork for RefreshWork {
    async fn execute(&self, context: &mut dyn WorkExecutionContext) -> WorkResult {
        let transport = context.transport().clone();
        transport
            .refresh(&self.indexes)
            .await
            .map_err(WorkError::transport)?;
        Ok(WorkOutcome::Refreshed)
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new("refresh")
    }
}
