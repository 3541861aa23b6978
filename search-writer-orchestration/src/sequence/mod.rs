//! The work sequence: ordered execution of one changeset.
//!
//! A sequence is built step by step while works are appended, then turned
//! into a single future that runs the steps strictly in order. Three step
//! kinds exist: plain non-bulk executions, bulk executions (which await the
//! bulk assembled by the bulker), and per-work bulk result extractions.
//!
//! Failure propagation is positional: once a step fails, every later
//! non-extraction step is skipped with the first failure as its cause.
//! Extraction steps are exempt from skipping because their works were
//! already executed inside the bulk request; they report what actually
//! happened to their positional item instead.

use std::mem;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use tokio::sync::oneshot;
use tracing::{debug, instrument};

use crate::context::{RefreshPolicy, SequenceContext};
use crate::errors::WorkError;
use crate::failure::{FailureCollector, FailureHandler};
use crate::submission::WorkResultFuture;
use crate::work::{BulkWork, BulkableWork, NonBulkableWork, RefreshWork, WorkResult};
use search_writer_shared::WorkInfo;
use search_writer_transport::{BulkItem, BulkResponse, SearchTransport, TransportError};

/// Sender half for one work's result future.
pub(crate) type ResultSender = oneshot::Sender<WorkResult>;

/// What the bulker hands a waiting bulk-execution step.
pub(crate) enum FinalizedBulk {
    /// Enough works accumulated: execute them as one bulk request.
    Bulk(BulkWork),
    /// Too few works to be worth a bulk: execute them individually, in
    /// order, at the bulk's position in the sequence.
    Singles(Vec<Arc<dyn BulkableWork>>),
}

/// Position of a bulk execution step within a sequence. Extraction steps
/// use it to find their bulk's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BulkSlot(usize);

enum SequenceStep {
    NonBulk {
        work: Arc<dyn NonBulkableWork>,
        result: ResultSender,
    },
    BulkExecution {
        bulk: oneshot::Receiver<FinalizedBulk>,
        slot: BulkSlot,
    },
    BulkExtraction {
        slot: BulkSlot,
        work: Arc<dyn BulkableWork>,
        index: usize,
        result: ResultSender,
    },
}

/// Builds the step list for one changeset and turns it into a runnable
/// future.
///
/// A builder is long-lived: [`WorkSequenceBuilder::init`] starts a fresh
/// sequence, the `add_*` methods extend it, and [`WorkSequenceBuilder::build`]
/// consumes the accumulated steps, leaving the builder ready for the next
/// `init`.
pub(crate) struct WorkSequenceBuilder {
    transport: Arc<dyn SearchTransport>,
    refresh_policy: RefreshPolicy,
    failure_handler: Arc<dyn FailureHandler>,
    previous: Option<BoxFuture<'static, ()>>,
    steps: Vec<SequenceStep>,
    slots: usize,
}

impl WorkSequenceBuilder {
    pub(crate) fn new(
        transport: Arc<dyn SearchTransport>,
        refresh_policy: RefreshPolicy,
        failure_handler: Arc<dyn FailureHandler>,
    ) -> Self {
        Self {
            transport,
            refresh_policy,
            failure_handler,
            previous: None,
            steps: Vec::new(),
            slots: 0,
        }
    }

    /// Start a new sequence anchored on `previous`: the first step runs
    /// only once `previous` has completed. Completion is all that matters;
    /// failures of the previous sequence never leak into this one.
    pub(crate) fn init(&mut self, previous: BoxFuture<'static, ()>) {
        self.previous = Some(previous);
        self.steps.clear();
        self.slots = 0;
    }

    /// Append a non-bulk execution and return the caller's result future.
    pub(crate) fn add_non_bulk_execution(
        &mut self,
        work: Arc<dyn NonBulkableWork>,
    ) -> WorkResultFuture {
        let (result, future) = WorkResultFuture::channel();
        self.push_non_bulk_execution(work, result);
        future
    }

    /// Append a non-bulk execution completing an externally held future.
    pub(crate) fn push_non_bulk_execution(
        &mut self,
        work: Arc<dyn NonBulkableWork>,
        result: ResultSender,
    ) {
        self.steps.push(SequenceStep::NonBulk { work, result });
    }

    /// Append a bulk execution step that will await `bulk`, and return the
    /// slot extraction steps refer back to.
    ///
    /// Called by the bulker the moment it opens a bulk, which pins the
    /// bulk's execution to the position of its first work.
    pub(crate) fn add_bulk_execution(
        &mut self,
        bulk: oneshot::Receiver<FinalizedBulk>,
    ) -> BulkSlot {
        let slot = BulkSlot(self.slots);
        self.slots += 1;
        self.steps.push(SequenceStep::BulkExecution { bulk, slot });
        slot
    }

    /// Append a result extraction for the work at `index` within the bulk
    /// at `slot`, and return the caller's result future.
    pub(crate) fn add_bulk_result_extraction(
        &mut self,
        slot: BulkSlot,
        work: Arc<dyn BulkableWork>,
        index: usize,
    ) -> WorkResultFuture {
        let (result, future) = WorkResultFuture::channel();
        self.push_bulk_result_extraction(slot, work, index, result);
        future
    }

    /// Append a result extraction completing an externally held future.
    pub(crate) fn push_bulk_result_extraction(
        &mut self,
        slot: BulkSlot,
        work: Arc<dyn BulkableWork>,
        index: usize,
        result: ResultSender,
    ) {
        self.steps
            .push(SequenceStep::BulkExtraction { slot, work, index, result });
    }

    pub(crate) fn has_steps(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Consume the accumulated steps into one future that executes them in
    /// order. The future never fails; per-work results travel through the
    /// result senders and failures additionally reach the failure handler.
    pub(crate) fn build(&mut self) -> BoxFuture<'static, ()> {
        let previous = self
            .previous
            .take()
            .unwrap_or_else(|| future::ready(()).boxed());
        let steps = mem::take(&mut self.steps);
        let slots = mem::replace(&mut self.slots, 0);
        let context = SequenceContext::for_policy(self.refresh_policy, self.transport.clone());
        let failure_handler = self.failure_handler.clone();
        run_sequence(previous, steps, slots, context, failure_handler).boxed()
    }
}

/// Outcome of a bulk execution step, consulted by its extraction steps.
enum BulkOutcome {
    /// The bulk was skipped because an earlier step failed.
    Skipped(Arc<WorkError>),
    /// The bulk request itself failed; no per-item outcomes exist.
    Failed(Arc<WorkError>),
    /// The bulk request completed with per-item outcomes.
    Executed(BulkResponse),
    /// The works ran individually; one result per work, in order.
    ExecutedSingly(Vec<WorkResult>),
}

/// Mutable state threaded through the steps of one running sequence.
struct SequenceState {
    /// First failure seen, if any. Later non-extraction steps skip on it.
    previous_failure: Option<Arc<WorkError>>,
    slots: Vec<Option<BulkOutcome>>,
    collector: FailureCollector,
}

impl SequenceState {
    fn new(slots: usize) -> Self {
        Self {
            previous_failure: None,
            slots: (0..slots).map(|_| None).collect(),
            collector: FailureCollector::default(),
        }
    }

    fn record_failure(&mut self, info: WorkInfo, error: Arc<WorkError>) {
        self.collector.record_failure(info, error.clone());
        if self.previous_failure.is_none() {
            self.previous_failure = Some(error);
        }
    }
}

#[instrument(skip_all, fields(steps = steps.len()))]
async fn run_sequence(
    previous: BoxFuture<'static, ()>,
    steps: Vec<SequenceStep>,
    slots: usize,
    mut context: SequenceContext,
    failure_handler: Arc<dyn FailureHandler>,
) {
    previous.await;

    debug!("Running work sequence");
    let mut state = SequenceState::new(slots);
    for step in steps {
        run_step(step, &mut context, &mut state).await;
    }
    flush_pending_refreshes(&mut context, &mut state).await;

    if let Some(report) = state.collector.finish() {
        failure_handler.handle(report);
    }
}

async fn run_step(step: SequenceStep, context: &mut SequenceContext, state: &mut SequenceState) {
    match step {
        SequenceStep::NonBulk { work, result } => {
            if let Some(cause) = state.previous_failure.clone() {
                state.collector.record_skipped(work.info());
                let _ = result.send(Err(WorkError::skipped(cause)));
                return;
            }
            match work.execute(context.as_context()).await {
                Ok(outcome) => {
                    let _ = result.send(Ok(outcome));
                }
                Err(error) => {
                    state.record_failure(work.info(), Arc::new(error.clone()));
                    let _ = result.send(Err(error));
                }
            }
        }

        SequenceStep::BulkExecution { bulk, slot } => {
            let outcome = if let Some(cause) = state.previous_failure.clone() {
                BulkOutcome::Skipped(cause)
            } else {
                match bulk.await {
                    // The bulker was reset before finalizing this bulk.
                    Err(_) => BulkOutcome::Failed(Arc::new(WorkError::Abandoned)),
                    Ok(FinalizedBulk::Bulk(bulk_work)) => {
                        match bulk_work.execute(context.as_context()).await {
                            Ok(response) => BulkOutcome::Executed(response),
                            Err(error) => BulkOutcome::Failed(Arc::new(error)),
                        }
                    }
                    Ok(FinalizedBulk::Singles(works)) => {
                        let mut results = Vec::with_capacity(works.len());
                        for work in works {
                            results.push(work.execute(context.as_context()).await);
                        }
                        BulkOutcome::ExecutedSingly(results)
                    }
                }
            };
            state.slots[slot.0] = Some(outcome);
        }

        SequenceStep::BulkExtraction { slot, work, index, result } => {
            run_extraction(slot, work, index, result, context, state);
        }
    }
}

/// Report what happened to one work of a bulk.
///
/// Deliberately does not consult `previous_failure`: by the time an
/// extraction runs, its work either already executed inside the bulk (and
/// the real outcome must be reported, even if a sibling's item failed) or
/// the whole bulk was skipped, which the slot outcome already records.
fn run_extraction(
    slot: BulkSlot,
    work: Arc<dyn BulkableWork>,
    index: usize,
    result: ResultSender,
    context: &mut SequenceContext,
    state: &mut SequenceState,
) {
    enum ItemView {
        Skipped(Arc<WorkError>),
        BulkFailed(Arc<WorkError>),
        Item(Option<BulkItem>),
        Single(Option<WorkResult>),
    }

    let view = match state.slots.get(slot.0).and_then(Option::as_ref) {
        // No outcome recorded for the slot. Cannot happen in a sequence
        // assembled by the bulker, which always registers the execution
        // step ahead of its extractions; treat it as an abandoned bulk.
        None => ItemView::BulkFailed(Arc::new(WorkError::Abandoned)),
        Some(BulkOutcome::Skipped(cause)) => ItemView::Skipped(cause.clone()),
        Some(BulkOutcome::Failed(cause)) => ItemView::BulkFailed(cause.clone()),
        Some(BulkOutcome::Executed(response)) => ItemView::Item(response.items.get(index).cloned()),
        Some(BulkOutcome::ExecutedSingly(results)) => {
            ItemView::Single(results.get(index).cloned())
        }
    };

    match view {
        ItemView::Skipped(cause) => {
            state.collector.record_skipped(work.info());
            let _ = result.send(Err(WorkError::skipped(cause)));
        }
        ItemView::BulkFailed(cause) => {
            let error = WorkError::bulk_failed(cause);
            state.record_failure(work.info(), Arc::new(error.clone()));
            let _ = result.send(Err(error));
        }
        ItemView::Item(Some(item)) => {
            match work.handle_bulk_item(context.as_context(), &item) {
                Ok(outcome) => {
                    let _ = result.send(Ok(outcome));
                }
                Err(error) => {
                    state.record_failure(work.info(), Arc::new(error.clone()));
                    let _ = result.send(Err(error));
                }
            }
        }
        ItemView::Item(None) => {
            // Guarded against by the bulk work's response validation.
            let error = WorkError::transport(TransportError::invalid_response(format!(
                "bulk response has no item at position {index}"
            )));
            state.record_failure(work.info(), Arc::new(error.clone()));
            let _ = result.send(Err(error));
        }
        ItemView::Single(Some(single_result)) => {
            if let Err(error) = &single_result {
                state.record_failure(work.info(), Arc::new(error.clone()));
            }
            let _ = result.send(single_result);
        }
        ItemView::Single(None) => {
            let error = WorkError::Abandoned;
            state.record_failure(work.info(), Arc::new(error.clone()));
            let _ = result.send(Err(error));
        }
    }
}

/// Refresh every index the changeset marked dirty, as one trailing call.
///
/// Runs even when the sequence failed part-way: works that did succeed
/// still registered their indexes and their writes must become visible.
async fn flush_pending_refreshes(context: &mut SequenceContext, state: &mut SequenceState) {
    let indexes = context.take_indexes_to_refresh();
    if indexes.is_empty() {
        return;
    }

    debug!(indexes = ?indexes, "Refreshing indexes touched by the changeset");
    let work = RefreshWork::new(indexes);
    let mut refresh_context =
        crate::context::ImmutableExecutionContext::new(context.transport().clone());
    if let Err(error) = work.execute(&mut refresh_context).await {
        state.record_failure(work.info(), Arc::new(error));
    }
}
