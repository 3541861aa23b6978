//! The work processor: the engine core every orchestrator drives.
//!
//! A processor owns one sequence builder and one aggregator and turns
//! changesets into spawned sequence tasks. It also remembers the tail of
//! the last sequence so serial orchestrators can anchor the next one on it.

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::aggregator::WorkAggregator;
use crate::failure::FailureHandler;
use crate::orchestrator::{OrchestratorConfig, OrderingPolicy};
use crate::sequence::{ResultSender, WorkSequenceBuilder};
use crate::submission::{ChangesetFuture, WorkResultFuture};
use crate::work::Work;
use search_writer_transport::SearchTransport;

/// Builds and spawns one sequence per changeset.
///
/// Not thread-safe by design: a processor belongs to a single submitting
/// task (the caller's for serial/parallel orchestrators, the consumer's
/// for the batching one), so its state needs no locking.
pub(crate) struct WorkProcessor {
    ordering: OrderingPolicy,
    builder: WorkSequenceBuilder,
    aggregator: WorkAggregator,
    /// Completion of the most recently spawned sequence.
    tail: ChangesetFuture,
    /// Handles of spawned sequences not yet known to have finished.
    tasks: Vec<JoinHandle<()>>,
}

impl WorkProcessor {
    pub(crate) fn new(
        ordering: OrderingPolicy,
        config: &OrchestratorConfig,
        transport: Arc<dyn SearchTransport>,
        failure_handler: Arc<dyn FailureHandler>,
    ) -> Self {
        Self {
            ordering,
            builder: WorkSequenceBuilder::new(transport, config.refresh, failure_handler),
            aggregator: WorkAggregator::new(config.max_bulk_size, config.min_bulk_size),
            tail: ChangesetFuture::ready(),
            tasks: Vec::new(),
        }
    }

    /// Start a fresh sequence for the next changeset.
    pub(crate) fn begin_sequence(&mut self) {
        let anchor: BoxFuture<'static, ()> = match self.ordering {
            OrderingPolicy::Serial => self.tail.clone().boxed(),
            OrderingPolicy::Parallel => future::ready(()).boxed(),
        };
        self.builder.init(anchor);
        self.aggregator.reset();
    }

    /// Append a work to the current sequence.
    pub(crate) fn add(&mut self, work: Work) -> WorkResultFuture {
        self.aggregator.add(work, &mut self.builder)
    }

    /// Append a work completing an externally held future.
    pub(crate) fn add_with_sender(&mut self, work: Work, result: ResultSender) {
        self.aggregator
            .add_with_sender(work, result, &mut self.builder);
    }

    /// Append a work as a plain single execution, bypassing the bulker.
    pub(crate) fn add_unbulked(&mut self, work: Work) -> WorkResultFuture {
        let (result, future) = WorkResultFuture::channel();
        self.add_unbulked_with_sender(work, result);
        future
    }

    /// Append an unbulked work completing an externally held future.
    pub(crate) fn add_unbulked_with_sender(&mut self, work: Work, result: ResultSender) {
        self.aggregator
            .add_unbulked_with_sender(work, result, &mut self.builder);
    }

    /// Cut any open bulk, spawn the sequence, and return its completion.
    ///
    /// An empty changeset spawns nothing and completes immediately.
    pub(crate) fn finish_sequence(&mut self) -> ChangesetFuture {
        self.aggregator.flush();
        if !self.builder.has_steps() {
            return ChangesetFuture::ready();
        }

        let sequence = self.builder.build();
        let (done, completion_signal) = oneshot::channel();
        // Sweep finished handles so the list stays bounded by what is
        // actually in flight.
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(tokio::spawn(async move {
            sequence.await;
            let _ = done.send(());
        }));

        let completion = ChangesetFuture::from_receiver(completion_signal);
        if self.ordering == OrderingPolicy::Serial {
            self.tail = completion.clone();
        }
        completion
    }

    /// Spawn a follow-up future whose completion
    /// [`WorkProcessor::wait_idle`] covers.
    pub(crate) fn track<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(future));
    }

    /// Wait until every spawned sequence and tracked follow-up completed.
    /// Callers stop submitting before waiting.
    pub(crate) async fn wait_idle(&mut self) {
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubBulkable, StubNonBulkable, StubTransport};
    use crate::work::Work;
    use search_writer_shared::RefreshStrategy;

    struct NoopHandler;
    impl FailureHandler for NoopHandler {
        fn handle(&self, _report: crate::failure::FailureReport) {}
    }

    fn processor(ordering: OrderingPolicy, transport: Arc<StubTransport>) -> WorkProcessor {
        WorkProcessor::new(
            ordering,
            &OrchestratorConfig {
                min_bulk_size: 1,
                ..OrchestratorConfig::default()
            },
            transport,
            Arc::new(NoopHandler),
        )
    }

    #[tokio::test]
    async fn empty_changeset_completes_without_spawning() {
        let transport = StubTransport::arc();
        let mut processor = processor(OrderingPolicy::Serial, transport.clone());

        processor.begin_sequence();
        let completion = processor.finish_sequence();
        completion.await;

        processor.wait_idle().await;
        assert!(transport.single_calls().is_empty());
        assert!(transport.bulk_calls().is_empty());
    }

    #[tokio::test]
    async fn changesets_share_machinery_but_not_bulks() {
        let transport = StubTransport::arc();
        let mut processor = processor(OrderingPolicy::Serial, transport.clone());

        processor.begin_sequence();
        let a = processor.add(Work::Bulkable(StubBulkable::arc("a", RefreshStrategy::None)));
        let first = processor.finish_sequence();

        processor.begin_sequence();
        let b = processor.add(Work::Bulkable(StubBulkable::arc("b", RefreshStrategy::None)));
        let second = processor.finish_sequence();

        first.await;
        second.await;
        a.await.unwrap();
        b.await.unwrap();
        // One bulk per changeset; bulks never span finish_sequence calls.
        assert_eq!(
            transport.bulk_calls(),
            vec![vec!["a".to_owned()], vec!["b".to_owned()]]
        );
    }

    #[tokio::test]
    async fn unbulked_work_skips_the_bulker() {
        let transport = StubTransport::arc();
        let mut processor = processor(OrderingPolicy::Parallel, transport.clone());

        processor.begin_sequence();
        let solo =
            processor.add_unbulked(Work::Bulkable(StubBulkable::arc("solo", RefreshStrategy::None)));
        let completion = processor.finish_sequence();

        completion.await;
        solo.await.unwrap();
        assert!(transport.bulk_calls().is_empty());
        assert_eq!(transport.single_calls(), vec!["solo".to_owned()]);
    }

    #[tokio::test]
    async fn non_bulkable_work_flows_through() {
        let transport = StubTransport::arc();
        let mut processor = processor(OrderingPolicy::Serial, transport.clone());

        processor.begin_sequence();
        let ping = processor.add(Work::NonBulkable(StubNonBulkable::arc("ping")));
        processor.finish_sequence().await;

        ping.await.unwrap();
        assert_eq!(transport.single_calls(), vec!["ping".to_owned()]);
    }
}
