//! Orchestrator that runs changesets strictly one after another.

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

/// Orchestrator for callers that need changesets applied in submission
/// order, such as an event stream replaying writes for one entity.
///
/// Each `submit` call becomes one sequence; a sequence starts only after
/// the previous one completed, so results observed by the store appear in
/// submission order. Bulks never span submissions.
///
/// Not shareable: submissions go through `&mut self`, which is exactly the
/// single-writer discipline the engine's unlocked internals rely on.
pub struct SerialWorkOrchestrator {
    processor: WorkProcessor,
    closed: bool,
}

impl SerialWorkOrchestrator {
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
                OrderingPolicy::Serial,
                &config,
                transport,
                failure_handler,
            ),
            closed: false,
        }
    }

    fn submit_changeset(&mut self, works: Vec<Work>) -> Result<SubmittedChangeset, SubmitError> {
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
}

#[async_trait]
impl ChangesetOrchestrator for SerialWorkOrchestrator {
    async fn submit(&mut self, works: Vec<Work>) -> Result<SubmittedChangeset, SubmitError> {
        self.submit_changeset(works)
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
