//! Futures handed back to callers when they submit work.
//!
//! Submission is decoupled from execution: an orchestrator may run the
//! works on the caller's task, on a background task, or not yet at all.
//! These futures are the caller's only view of progress, and they are
//! guaranteed to resolve; an orchestrator that drops work resolves them
//! with [`WorkError::Abandoned`] rather than leaving them pending forever.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;

use crate::errors::WorkError;
use crate::work::WorkResult;

/// Resolves with the result of one submitted work.
pub struct WorkResultFuture {
    receiver: oneshot::Receiver<WorkResult>,
}

impl WorkResultFuture {
    pub(crate) fn new(receiver: oneshot::Receiver<WorkResult>) -> Self {
        Self { receiver }
    }

    /// Create a future together with the sender that completes it.
    pub(crate) fn channel() -> (oneshot::Sender<WorkResult>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self::new(receiver))
    }
}

impl Future for WorkResultFuture {
    type Output = WorkResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The sender was dropped without completing the work.
            Poll::Ready(Err(_)) => Poll::Ready(Err(WorkError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Resolves when every work of a submitted changeset has completed, whether
/// successfully or not.
///
/// Cloneable so that several parties can wait on the same changeset.
#[derive(Clone)]
pub struct ChangesetFuture {
    inner: Shared<BoxFuture<'static, ()>>,
}

impl ChangesetFuture {
    pub(crate) fn from_shared(inner: Shared<BoxFuture<'static, ()>>) -> Self {
        Self { inner }
    }

    /// A completion that has already happened.
    pub(crate) fn ready() -> Self {
        Self::from_shared(futures::future::ready(()).boxed().shared())
    }

    /// Build a completion future from a oneshot signal. A dropped sender
    /// counts as completion, so the future can never hang.
    pub(crate) fn from_receiver(receiver: oneshot::Receiver<()>) -> Self {
        let inner = async move {
            let _ = receiver.await;
        }
        .boxed()
        .shared();
        Self { inner }
    }
}

impl Future for ChangesetFuture {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

/// What a caller gets back from submitting a changeset.
pub struct SubmittedChangeset {
    /// One result future per submitted work, in submission order.
    pub results: Vec<WorkResultFuture>,
    /// Resolves once the whole changeset (including any trailing refresh)
    /// has completed.
    pub completion: ChangesetFuture,
}
