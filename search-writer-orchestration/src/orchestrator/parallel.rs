//! Orchestrator that runs changesets independently of each other.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::SubmitError;
use crate::failure::{FailureHandler, LoggingFailureHandler};
use crate::orchestrator::{
    ChangesetOrchestrator, OrchestratorConfig, OrderingPolicy, WorkProcessor,
};
use crate::submission::{SubmittedChangeset, WorkResultFuture};
use crate::work::Work;
use search_writer_transport::SearchTransport;

/// Orchestrator for callers whose changesets are mutually independent.
///
/// Works within one changeset still execute in order with the usual
/// skip-on-failure semantics, but separate changesets impose no ordering on
/// each other: a slow changeset never delays a later submission. Bulks
/// never span submissions.
pub struct ParallelWorkOrchestrator {
    processor: WorkProcessor,
    closed: bool,
}

impl ParallelWorkOrchestrator {
    /// Create an orchestrator with default configuration, reporting
    /// failures to the log.
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self::with_config(
            transport,
            OrchestratorConfig::default(),
            Arc::new(LoggingFailureHandler),
        )
    }

    /// Create an orchestrator with custom configuration.
    pub fn with_config(
        transport: Arc<dyn SearchTransport>,
        config: OrchestratorConfig,
        failure_handler: Arc<dyn FailureHandler>,
    ) -> Self {
        Self {
            processor: WorkProcessor::new(
                OrderingPolicy::Parallel,
                &config,
                transport,
                failure_handler,
            ),
            closed: false,
        }
    }
}

#[async_trait]
impl ChangesetOrchestrator for ParallelWorkOrchestrator {
    async fn submit(&mut self, works: Vec<Work>) -> Result<SubmittedChangeset, SubmitError> {
        if self.closed {
            return Err(SubmitError::Closed);
        }
        self.processor.begin_sequence();
        let results = works
            .into_iter()
            .map(|work| self.processor.add(work))
            .collect();
        let completion = self.processor.finish_sequence();
        Ok(SubmittedChangeset {
            results,
            completion,
        })
    }

    async fn submit_one(&mut self, work: Work) -> Result<WorkResultFuture, SubmitError> {
        if self.closed {
            return Err(SubmitError::Closed);
        }
        self.processor.begin_sequence();
        // A lone work gains nothing from a one-entry bulk; run it directly.
        let result = self.processor.add_unbulked(work);
        self.processor.finish_sequence();
        Ok(result)
    }

    async fn pre_stop(&mut self) {
        self.closed = true;
        self.processor.wait_idle().await;
    }

    fn stop(&mut self) {
        self.closed = true;
    }
}
