//! Orchestrator that accumulates works until the caller flushes them.

use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::SubmitError;
use crate::failure::{FailureHandler, LoggingFailureHandler};
use crate::orchestrator::{
    ChangesetOrchestrator, OrchestratorConfig, OrderingPolicy, WorkProcessor,
};
use crate::sequence::ResultSender;
use crate::submission::{ChangesetFuture, SubmittedChangeset, WorkResultFuture};
use crate::work::Work;
use search_writer_transport::SearchTransport;

struct PendingWork {
    work: Work,
    result: ResultSender,
    unbulked: bool,
}

/// Orchestrator for callers that decide themselves when accumulated writes
/// hit the store, typically at the end of a transaction.
///
/// `submit` only records the works; nothing executes until
/// [`execute_submitted`](AccumulatingWorkOrchestrator::execute_submitted)
/// turns everything recorded so far into one sequence. Works accumulated
/// across several submissions share bulks. [`reset`] discards recorded
/// works instead of executing them, resolving their futures as abandoned.
///
/// [`reset`]: AccumulatingWorkOrchestrator::reset
pub struct AccumulatingWorkOrchestrator {
    processor: WorkProcessor,
    pending: Vec<PendingWork>,
    pending_completions: Vec<oneshot::Sender<()>>,
    closed: bool,
}

impl AccumulatingWorkOrchestrator {
    /// Create an orchestrator with default configuration, reporting
    /// failures to the log.
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self::with_config(
            transport,
            OrchestratorConfig::default(),
            Arc::new(LoggingFailureHandler),
        )
    }

    /// Create an orchestrator with custom configuration. Successive
    /// `execute_submitted` batches run one after another.
    pub fn with_config(
        transport: Arc<dyn SearchTransport>,
        config: OrchestratorConfig,
        failure_handler: Arc<dyn FailureHandler>,
    ) -> Self {
        Self {
            processor: WorkProcessor::new(
                OrderingPolicy::Serial,
                &config,
                transport,
                failure_handler,
            ),
            pending: Vec::new(),
            pending_completions: Vec::new(),
            closed: false,
        }
    }

    /// Execute everything recorded since the last flush as one sequence.
    ///
    /// Returns the sequence's completion future. The completion futures of
    /// the covered submissions resolve along with it.
    pub fn execute_submitted(&mut self) -> ChangesetFuture {
        let pending = mem::take(&mut self.pending);
        let completions = mem::take(&mut self.pending_completions);
        debug!(works = pending.len(), "Executing accumulated works");

        self.processor.begin_sequence();
        for entry in pending {
            if entry.unbulked {
                self.processor.add_unbulked_with_sender(entry.work, entry.result);
            } else {
                self.processor.add_with_sender(entry.work, entry.result);
            }
        }
        let completion = self.processor.finish_sequence();

        if !completions.is_empty() {
            let sequence_done = completion.clone();
            self.processor.track(async move {
                sequence_done.await;
                for sender in completions {
                    let _ = sender.send(());
                }
            });
        }
        completion
    }

    /// Discard everything recorded since the last flush. The discarded
    /// works' futures resolve as abandoned.
    pub fn reset(&mut self) {
        let discarded = self.pending.len();
        if discarded > 0 {
            debug!(works = discarded, "Discarding accumulated works");
        }
        self.pending.clear();
        self.pending_completions.clear();
    }

    fn record(&mut self, work: Work, unbulked: bool) -> WorkResultFuture {
        let (result, future) = WorkResultFuture::channel();
        self.pending.push(PendingWork {
            work,
            result,
            unbulked,
        });
        future
    }
}

#[async_trait]
impl ChangesetOrchestrator for AccumulatingWorkOrchestrator {
    async fn submit(&mut self, works: Vec<Work>) -> Result<SubmittedChangeset, SubmitError> {
        if self.closed {
            return Err(SubmitError::Closed);
        }
        let results = works
            .into_iter()
            .map(|work| self.record(work, false))
            .collect();
        let (completion_sender, completion_receiver) = oneshot::channel();
        self.pending_completions.push(completion_sender);
        Ok(SubmittedChangeset {
            results,
            completion: ChangesetFuture::from_receiver(completion_receiver),
        })
    }

    async fn submit_one(&mut self, work: Work) -> Result<WorkResultFuture, SubmitError> {
        if self.closed {
            return Err(SubmitError::Closed);
        }
        // A lone work gains nothing from a one-entry bulk; run it directly.
        Ok(self.record(work, true))
    }

    async fn pre_stop(&mut self) {
        self.closed = true;
        self.processor.wait_idle().await;
    }

    fn stop(&mut self) {
        self.closed = true;
        self.reset();
    }
}
