//! The bulker: groups consecutive bulkable works into bulk requests.
//!
//! The bulker is an accumulator over one sequence. The first bulkable work
//! opens a bulk and pins a bulk execution step at that position; further
//! works join the open bulk until it is cut. A bulk is cut when it reaches
//! the maximum size, when a work with a different refresh strategy arrives,
//! or when the aggregator orders a cut for sequence-ordering reasons.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::debug;

use crate::sequence::{BulkSlot, FinalizedBulk, ResultSender, WorkSequenceBuilder};
use crate::submission::WorkResultFuture;
use crate::work::{BulkWork, BulkableWork};
use search_writer_shared::RefreshStrategy;

struct OpenBulk {
    strategy: RefreshStrategy,
    works: Vec<Arc<dyn BulkableWork>>,
    sender: oneshot::Sender<FinalizedBulk>,
    slot: BulkSlot,
}

/// Accumulates bulkable works into bulks of bounded size.
pub(crate) struct WorkBulker {
    max_bulk_size: usize,
    min_bulk_size: usize,
    current: Option<OpenBulk>,
}

impl WorkBulker {
    /// Create a bulker cutting bulks at `max_bulk_size` works and demoting
    /// bulks smaller than `min_bulk_size` to individual executions.
    pub(crate) fn new(max_bulk_size: usize, min_bulk_size: usize) -> Self {
        Self {
            // A bulk of zero works is meaningless; treat 0 as 1.
            max_bulk_size: max_bulk_size.max(1),
            min_bulk_size,
            current: None,
        }
    }

    /// Add a bulkable work, returning the caller's result future.
    pub(crate) fn add(
        &mut self,
        work: Arc<dyn BulkableWork>,
        builder: &mut WorkSequenceBuilder,
    ) -> WorkResultFuture {
        let (result, future) = WorkResultFuture::channel();
        self.add_with_sender(work, result, builder);
        future
    }

    /// Add a bulkable work completing an externally held future.
    pub(crate) fn add_with_sender(
        &mut self,
        work: Arc<dyn BulkableWork>,
        result: ResultSender,
        builder: &mut WorkSequenceBuilder,
    ) {
        let strategy = work.refresh_strategy();
        // A bulk never mixes refresh strategies.
        if self
            .current
            .as_ref()
            .is_some_and(|open| open.strategy != strategy)
        {
            self.finalize_bulk_work();
        }

        let open = self.current.get_or_insert_with(|| {
            let (sender, receiver) = oneshot::channel();
            let slot = builder.add_bulk_execution(receiver);
            OpenBulk {
                strategy,
                works: Vec::new(),
                sender,
                slot,
            }
        });

        open.works.push(Arc::clone(&work));
        let slot = open.slot;
        let index = open.works.len() - 1;
        builder.push_bulk_result_extraction(slot, work, index, result);

        if self
            .current
            .as_ref()
            .is_some_and(|open| open.works.len() >= self.max_bulk_size)
        {
            self.finalize_bulk_work();
        }
    }

    /// Cut the open bulk, handing it to its waiting execution step. Bulks
    /// below the minimum size are demoted to individual executions at the
    /// same sequence position. No-op when no bulk is open.
    pub(crate) fn finalize_bulk_work(&mut self) {
        let Some(open) = self.current.take() else {
            return;
        };
        let OpenBulk {
            strategy,
            works,
            sender,
            ..
        } = open;

        let finalized = if works.len() >= self.min_bulk_size {
            debug!(works = works.len(), strategy = ?strategy, "Finalizing bulk");
            FinalizedBulk::Bulk(BulkWork::new(works, strategy))
        } else {
            debug!(works = works.len(), "Bulk below minimum size; executing individually");
            FinalizedBulk::Singles(works)
        };
        // Fails only when the sequence holding the execution step was
        // discarded, in which case there is nobody left to run the bulk.
        let _ = sender.send(finalized);
    }

    /// Drop any open bulk without executing it. Its works resolve as
    /// abandoned when their sequence runs.
    pub(crate) fn reset(&mut self) {
        self.current = None;
    }

    pub(crate) fn has_open_bulk(&self) -> bool {
        self.current.is_some()
    }
}
