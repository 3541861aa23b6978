//! Orchestrator that batches submissions from many tasks through a queue.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

use crate::context::RefreshPolicy;
use crate::errors::SubmitError;
use crate::executor::{BatchingExecutor, WorkSet};
use crate::failure::{FailureHandler, LoggingFailureHandler};
use crate::orchestrator::{
    ChangesetOrchestrator, OrchestratorConfig, OrderingPolicy, WorkProcessor,
};
use crate::submission::{ChangesetFuture, SubmittedChangeset, WorkResultFuture};
use crate::work::Work;
use search_writer_transport::SearchTransport;

/// Configuration for the batching orchestrator.
#[derive(Debug, Clone)]
pub struct BatchingConfig {
    /// Capacity of the submission queue.
    pub queue_capacity: usize,
    /// Largest number of works one execution cycle drains from the queue.
    /// A single submission larger than this still runs whole.
    pub max_items_per_batch: usize,
    /// When true, full-queue submissions wait in strict arrival order.
    /// When false, submitters may squeeze into freed capacity out of turn.
    pub fair: bool,
    /// Whether successive execution cycles run serially or independently.
    pub ordering: OrderingPolicy,
    /// Largest number of works in one bulk request.
    pub max_bulk_size: usize,
    /// Bulks smaller than this execute their works individually instead.
    /// Defaults to 1 here: a background batcher keeps even lone works in
    /// their bulk shape.
    pub min_bulk_size: usize,
    /// What to do with the refresh registrations works make.
    pub refresh: RefreshPolicy,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            max_items_per_batch: 500,
            fair: true,
            ordering: OrderingPolicy::Serial,
            max_bulk_size: 250,
            min_bulk_size: 1,
            refresh: RefreshPolicy::Track,
        }
    }
}

impl BatchingConfig {
    fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_bulk_size: self.max_bulk_size,
            min_bulk_size: self.min_bulk_size,
            refresh: self.refresh,
        }
    }
}

/// Submission state shared between the orchestrator and its submitters.
struct SubmitState {
    /// `None` once the orchestrator stopped admitting work. Submissions
    /// hold the read half across their send so that shutdown, which takes
    /// the write half, waits for submissions already past the closed check.
    sender: RwLock<Option<mpsc::Sender<WorkSet>>>,
    fair: bool,
}

/// A cloneable handle for submitting work to a [`BatchingWorkOrchestrator`]
/// from any task.
#[derive(Clone)]
pub struct BatchingSubmitter {
    state: Arc<SubmitState>,
}

impl BatchingSubmitter {
    /// Submit a changeset. The works land in one execution cycle together
    /// and may share bulks with other submissions queued around them.
    pub async fn submit(&self, works: Vec<Work>) -> Result<SubmittedChangeset, SubmitError> {
        let mut results = Vec::with_capacity(works.len());
        let mut paired = Vec::with_capacity(works.len());
        for work in works {
            let (result, future) = WorkResultFuture::channel();
            paired.push((work, result));
            results.push(future);
        }
        let (completion_sender, completion_receiver) = oneshot::channel();
        self.send(WorkSet {
            works: paired,
            completion: completion_sender,
        })
        .await?;
        Ok(SubmittedChangeset {
            results,
            completion: ChangesetFuture::from_receiver(completion_receiver),
        })
    }

    /// Submit a single work. Unlike the caller-thread orchestrators, the
    /// batching orchestrator does bulk lone submissions: being grouped with
    /// neighbours from the queue is its whole point.
    pub async fn submit_one(&self, work: Work) -> Result<WorkResultFuture, SubmitError> {
        let (result, future) = WorkResultFuture::channel();
        let (completion_sender, _) = oneshot::channel();
        self.send(WorkSet {
            works: vec![(work, result)],
            completion: completion_sender,
        })
        .await?;
        Ok(future)
    }

    async fn send(&self, set: WorkSet) -> Result<(), SubmitError> {
        let guard = self.state.sender.read().await;
        let Some(sender) = guard.as_ref() else {
            return Err(SubmitError::Closed);
        };
        if self.state.fair {
            sender.send(set).await.map_err(|_| SubmitError::Closed)
        } else {
            match sender.try_send(set) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(set)) => {
                    sender.send(set).await.map_err(|_| SubmitError::Closed)
                }
                Err(mpsc::error::TrySendError::Closed(_)) => Err(SubmitError::Closed),
            }
        }
    }
}

/// Orchestrator that funnels submissions from many tasks into batched
/// sequences executed by one background consumer.
///
/// Built for high-throughput ingestion: submitters on any task hand their
/// works to the queue and the consumer groups whatever is queued into one
/// sequence per cycle, so bulks form across submission boundaries.
///
/// The orchestrator is inert until [`start`](ChangesetOrchestrator::start)
/// spawns the consumer; submissions queue up meanwhile.
pub struct BatchingWorkOrchestrator {
    config: BatchingConfig,
    transport: Arc<dyn SearchTransport>,
    failure_handler: Arc<dyn FailureHandler>,
    state: Arc<SubmitState>,
    receiver: Option<mpsc::Receiver<WorkSet>>,
    consumer: Option<JoinHandle<()>>,
}

impl BatchingWorkOrchestrator {
    /// Create an orchestrator with default configuration, reporting
    /// failures to the log.
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self::with_config(
            transport,
            BatchingConfig::default(),
            Arc::new(LoggingFailureHandler),
        )
    }

    /// Create an orchestrator with custom configuration.
    pub fn with_config(
        transport: Arc<dyn SearchTransport>,
        config: BatchingConfig,
        failure_handler: Arc<dyn FailureHandler>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            state: Arc::new(SubmitState {
                sender: RwLock::new(Some(sender)),
                fair: config.fair,
            }),
            receiver: Some(receiver),
            consumer: None,
            config,
            transport,
            failure_handler,
        }
    }

    /// A cloneable handle for submitting from any task.
    pub fn submitter(&self) -> BatchingSubmitter {
        BatchingSubmitter {
            state: self.state.clone(),
        }
    }
}

#[async_trait]
impl ChangesetOrchestrator for BatchingWorkOrchestrator {
    /// Spawn the background consumer. Submissions queued before the start
    /// are drained in arrival order. Idempotent.
    fn start(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            return;
        };
        let processor = WorkProcessor::new(
            self.config.ordering,
            &self.config.orchestrator_config(),
            self.transport.clone(),
            self.failure_handler.clone(),
        );
        let executor =
            BatchingExecutor::new(receiver, processor, self.config.max_items_per_batch);
        info!(
            queue_capacity = self.config.queue_capacity,
            max_items_per_batch = self.config.max_items_per_batch,
            fair = self.config.fair,
            "Starting batching orchestrator"
        );
        self.consumer = Some(tokio::spawn(executor.run()));
    }

    async fn submit(&mut self, works: Vec<Work>) -> Result<SubmittedChangeset, SubmitError> {
        self.submitter().submit(works).await
    }

    async fn submit_one(&mut self, work: Work) -> Result<WorkResultFuture, SubmitError> {
        self.submitter().submit_one(work).await
    }

    /// Close the queue, then wait until the consumer has drained and
    /// executed everything that was admitted. Idempotent.
    async fn pre_stop(&mut self) {
        // Dropping the queue up front is a no-op once started. On a
        // never-started orchestrator it abandons queued work and fails
        // submitters blocked on a full queue, which would otherwise hold
        // the read half and block the write below forever.
        self.receiver = None;
        {
            let mut sender = self.state.sender.write().await;
            sender.take();
        }
        if let Some(consumer) = self.consumer.take() {
            let _ = consumer.await;
        }
        info!("Batching orchestrator drained");
    }

    fn stop(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.abort();
        }
        self.receiver = None;
        // Best effort: if a submitter holds the read half mid-send, the
        // dropped queue fails that send instead of the closed flag.
        if let Ok(mut sender) = self.state.sender.try_write() {
            sender.take();
        }
    }
}

impl Drop for BatchingWorkOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}
