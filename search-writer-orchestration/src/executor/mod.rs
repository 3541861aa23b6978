//! Background execution plumbing for the batching orchestrator.
//!
//! Submissions arrive as [`WorkSet`]s on a bounded queue. The executor
//! takes what is queued, folds it into one sequence per cycle, runs the
//! sequence to completion, and only then starts the next cycle. Works from
//! different submitters therefore share bulks whenever they are queued
//! close together.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

use crate::orchestrator::WorkProcessor;
use crate::sequence::ResultSender;
use crate::work::Work;

/// One submission travelling through the batching queue.
///
/// A set is the unit of admission: it is never split across execution
/// cycles, so a submitter's changeset always lands in a single sequence.
pub(crate) struct WorkSet {
    pub(crate) works: Vec<(Work, ResultSender)>,
    pub(crate) completion: oneshot::Sender<()>,
}

/// Consumes queued work sets and executes them in batched sequences.
pub(crate) struct BatchingExecutor {
    receiver: mpsc::Receiver<WorkSet>,
    processor: WorkProcessor,
    max_items_per_batch: usize,
}

impl BatchingExecutor {
    pub(crate) fn new(
        receiver: mpsc::Receiver<WorkSet>,
        processor: WorkProcessor,
        max_items_per_batch: usize,
    ) -> Self {
        Self {
            receiver,
            processor,
            max_items_per_batch: max_items_per_batch.max(1),
        }
    }

    /// Run until the queue closes, then finish whatever is still queued.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) {
        while let Some(first) = self.receiver.recv().await {
            self.run_cycle(first).await;
        }
        info!("Work queue closed; batching executor finished");
    }

    #[instrument(skip(self, first), fields(lead_works = first.works.len()))]
    async fn run_cycle(&mut self, first: WorkSet) {
        let mut total_works = first.works.len();
        let mut sets = vec![first];
        // Greedy drain without waiting: whatever is queued right now joins
        // this cycle. The bound is checked between sets, never inside one.
        while total_works < self.max_items_per_batch {
            match self.receiver.try_recv() {
                Ok(set) => {
                    total_works += set.works.len();
                    sets.push(set);
                }
                Err(_) => break,
            }
        }
        debug!(sets = sets.len(), works = total_works, "Executing work batch");

        self.processor.begin_sequence();
        let mut completions = Vec::with_capacity(sets.len());
        for set in sets {
            let WorkSet { works, completion } = set;
            for (work, result) in works {
                self.processor.add_with_sender(work, result);
            }
            completions.push(completion);
        }
        let sequence = self.processor.finish_sequence();
        sequence.await;

        for completion in completions {
            let _ = completion.send(());
        }
    }
}
