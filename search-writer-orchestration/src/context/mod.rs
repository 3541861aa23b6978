//! Execution contexts handed to works while a sequence runs.
//!
//! A context gives a work two things: the transport to execute against and
//! a place to register indexes that need a refresh once the changeset is
//! done. The variants differ only in what they do with those registrations.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use search_writer_shared::IndexName;
use search_writer_transport::SearchTransport;

/// Configures what a sequence does with refresh registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Collect dirty indexes and refresh them once at the end of the
    /// sequence.
    #[default]
    Track,
    /// Discard refresh registrations. For callers that refresh on their own
    /// schedule or not at all.
    Ignore,
}

/// The view of the engine a work sees while executing.
///
/// Works receive `&mut dyn WorkExecutionContext` so the same work
/// implementation runs unchanged under every orchestrator.
pub trait WorkExecutionContext: Send {
    /// The transport to execute requests against.
    fn transport(&self) -> &Arc<dyn SearchTransport>;

    /// Record that `index` received a write and needs a refresh before the
    /// changeset is reported complete. Works call this on success only.
    fn register_index_to_refresh(&mut self, index: IndexName);
}

/// Context that collects dirty indexes for an end-of-sequence refresh.
///
/// Registrations are deduplicated and kept in name order, so the refresh
/// executed from them is deterministic.
pub struct RefreshTrackingContext {
    transport: Arc<dyn SearchTransport>,
    pending: BTreeSet<IndexName>,
}

impl RefreshTrackingContext {
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self {
            transport,
            pending: BTreeSet::new(),
        }
    }

    /// Whether any index is waiting for a refresh.
    pub fn has_pending_refreshes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain the collected indexes, leaving the context empty.
    pub fn take_pending_refreshes(&mut self) -> Vec<IndexName> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

impl WorkExecutionContext for RefreshTrackingContext {
    fn transport(&self) -> &Arc<dyn SearchTransport> {
        &self.transport
    }

    fn register_index_to_refresh(&mut self, index: IndexName) {
        self.pending.insert(index);
    }
}

/// Context for works that run after refresh handling is settled.
///
/// The engine's own end-of-sequence refresh executes with this context. At
/// that point nothing may dirty further indexes; a registration here is a
/// bug in the calling work, not a runtime condition, so it panics.
pub struct ImmutableExecutionContext {
    transport: Arc<dyn SearchTransport>,
}

impl ImmutableExecutionContext {
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self { transport }
    }
}

impl WorkExecutionContext for ImmutableExecutionContext {
    fn transport(&self) -> &Arc<dyn SearchTransport> {
        &self.transport
    }

    fn register_index_to_refresh(&mut self, index: IndexName) {
        panic!("attempted to register index '{index}' for refresh on an immutable execution context");
    }
}

/// Context that discards refresh registrations.
pub struct IgnoringExecutionContext {
    transport: Arc<dyn SearchTransport>,
}

impl IgnoringExecutionContext {
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self { transport }
    }
}

impl WorkExecutionContext for IgnoringExecutionContext {
    fn transport(&self) -> &Arc<dyn SearchTransport> {
        &self.transport
    }

    fn register_index_to_refresh(&mut self, index: IndexName) {
        debug!(index = %index, "Discarding refresh registration");
    }
}

/// The context a sequence runs its works under, chosen by [`RefreshPolicy`].
pub(crate) enum SequenceContext {
    Tracking(RefreshTrackingContext),
    Ignoring(IgnoringExecutionContext),
}

impl SequenceContext {
    pub(crate) fn for_policy(policy: RefreshPolicy, transport: Arc<dyn SearchTransport>) -> Self {
        match policy {
            RefreshPolicy::Track => Self::Tracking(RefreshTrackingContext::new(transport)),
            RefreshPolicy::Ignore => Self::Ignoring(IgnoringExecutionContext::new(transport)),
        }
    }

    pub(crate) fn as_context(&mut self) -> &mut dyn WorkExecutionContext {
        match self {
            Self::Tracking(context) => context,
            Self::Ignoring(context) => context,
        }
    }

    pub(crate) fn transport(&self) -> &Arc<dyn SearchTransport> {
        match self {
            Self::Tracking(context) => context.transport(),
            Self::Ignoring(context) => context.transport(),
        }
    }

    /// The indexes waiting for a refresh, in name order. Always empty for
    /// the ignoring variant.
    pub(crate) fn take_indexes_to_refresh(&mut self) -> Vec<IndexName> {
        match self {
            Self::Tracking(context) => context.take_pending_refreshes(),
            Self::Ignoring(_) => Vec::new(),
        }
    }
}
