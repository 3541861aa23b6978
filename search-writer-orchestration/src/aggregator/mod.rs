//! The aggregator: routes works into the sequence while keeping order.
//!
//! One aggregator serves a whole sequence. Bulkable works go through the
//! bulker; non-bulkable works append directly. The subtlety is ordering: a
//! bulk executes at the position of its first work, so once a non-bulkable
//! work lands after an open bulk, letting a later bulkable work join that
//! bulk would make it execute before the non-bulkable work it was submitted
//! after. The aggregator prevents that by remembering the interleaving and
//! cutting the bulk before the next bulkable work joins.

use std::sync::Arc;

use crate::bulker::WorkBulker;
use crate::sequence::{ResultSender, WorkSequenceBuilder};
use crate::submission::WorkResultFuture;
use crate::work::{NonBulkableWork, UnbulkedWork, Work};

/// Routes submitted works into bulked and non-bulked sequence steps.
pub(crate) struct WorkAggregator {
    bulker: WorkBulker,
    /// Set when a non-bulkable work was appended while a bulk was open. The
    /// open bulk may then no longer be extended.
    bulk_blocked: bool,
}

impl WorkAggregator {
    pub(crate) fn new(max_bulk_size: usize, min_bulk_size: usize) -> Self {
        Self {
            bulker: WorkBulker::new(max_bulk_size, min_bulk_size),
            bulk_blocked: false,
        }
    }

    /// Route a work into the sequence, returning the caller's result future.
    pub(crate) fn add(
        &mut self,
        work: Work,
        builder: &mut WorkSequenceBuilder,
    ) -> WorkResultFuture {
        let (result, future) = WorkResultFuture::channel();
        self.add_with_sender(work, result, builder);
        future
    }

    /// Route a work into the sequence, completing an externally held future.
    pub(crate) fn add_with_sender(
        &mut self,
        work: Work,
        result: ResultSender,
        builder: &mut WorkSequenceBuilder,
    ) {
        match work {
            Work::Bulkable(work) => {
                if self.bulk_blocked {
                    self.bulker.finalize_bulk_work();
                    self.bulk_blocked = false;
                }
                self.bulker.add_with_sender(work, result, builder);
            }
            Work::NonBulkable(work) => {
                self.append_non_bulk(work, result, builder);
            }
        }
    }

    /// Route a work as a plain single execution even if it is bulkable.
    /// Used for single-work submissions that bypass bulking.
    pub(crate) fn add_unbulked_with_sender(
        &mut self,
        work: Work,
        result: ResultSender,
        builder: &mut WorkSequenceBuilder,
    ) {
        let work: Arc<dyn NonBulkableWork> = match work {
            Work::NonBulkable(work) => work,
            Work::Bulkable(work) => Arc::new(UnbulkedWork::new(work)),
        };
        self.append_non_bulk(work, result, builder);
    }

    fn append_non_bulk(
        &mut self,
        work: Arc<dyn NonBulkableWork>,
        result: ResultSender,
        builder: &mut WorkSequenceBuilder,
    ) {
        builder.push_non_bulk_execution(work, result);
        if self.bulker.has_open_bulk() {
            self.bulk_blocked = true;
        }
    }

    /// Cut any open bulk. Called when the sequence is about to be built.
    pub(crate) fn flush(&mut self) {
        self.bulker.finalize_bulk_work();
        self.bulk_blocked = false;
    }

    /// Clear all accumulated state. Used when starting a new sequence;
    /// anything still open is abandoned rather than executed.
    pub(crate) fn reset(&mut self) {
        self.bulker.reset();
        self.bulk_blocked = false;
    }
}
