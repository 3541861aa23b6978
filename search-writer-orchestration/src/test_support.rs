//! Shared stubs for the crate's tests: a scriptable transport, canned works,
//! and a failure handler that records what it was given.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use crate::context::WorkExecutionContext;
use crate::errors::WorkError;
use crate::failure::{FailureHandler, FailureReport};
use crate::work::{BulkableWork, NonBulkableWork, WorkResult};
use search_writer_shared::{IndexName, RefreshStrategy, WorkInfo, WorkOutcome};
use search_writer_transport::{
    BulkAction, BulkItem, BulkResponse, RequestMethod, SearchTransport, TransportError,
    TransportRequest, TransportResponse,
};

/// Transport stub that records every call and serves scripted responses.
///
/// Works executed through it are identified by their `kind`, which appears
/// in the request path for single calls and in the action metadata for
/// bulk calls.
pub(crate) struct StubTransport {
    singles: Mutex<Vec<String>>,
    bulks: Mutex<Vec<Vec<String>>>,
    refreshes: Mutex<Vec<Vec<String>>>,
    failing_items: Mutex<Vec<String>>,
    fail_next_bulk: AtomicBool,
    fail_next_refresh: AtomicBool,
}

impl StubTransport {
    pub(crate) fn arc() -> Arc<Self> {
        Arc::new(Self {
            singles: Mutex::new(Vec::new()),
            bulks: Mutex::new(Vec::new()),
            refreshes: Mutex::new(Vec::new()),
            failing_items: Mutex::new(Vec::new()),
            fail_next_bulk: AtomicBool::new(false),
            fail_next_refresh: AtomicBool::new(false),
        })
    }

    /// Script the bulk item for `kind` to come back failed.
    pub(crate) fn fail_bulk_item(&self, kind: &str) {
        self.failing_items.lock().unwrap().push(kind.to_owned());
    }

    /// Script the next bulk call to fail as a whole.
    pub(crate) fn fail_next_bulk(&self) {
        self.fail_next_bulk.store(true, Ordering::SeqCst);
    }

    /// Script the next refresh call to fail.
    pub(crate) fn fail_next_refresh(&self) {
        self.fail_next_refresh.store(true, Ordering::SeqCst);
    }

    /// Kinds executed as single requests, in call order.
    pub(crate) fn single_calls(&self) -> Vec<String> {
        self.singles.lock().unwrap().clone()
    }

    /// Kinds per bulk call, in call order.
    pub(crate) fn bulk_calls(&self) -> Vec<Vec<String>> {
        self.bulks.lock().unwrap().clone()
    }

    /// Index names per refresh call, in call order.
    pub(crate) fn refresh_calls(&self) -> Vec<Vec<String>> {
        self.refreshes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchTransport for StubTransport {
    async fn request(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let kind = request
            .path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_owned();
        self.singles.lock().unwrap().push(kind);
        Ok(TransportResponse::new(200, None))
    }

    async fn bulk(&self, actions: Vec<BulkAction>) -> Result<BulkResponse, TransportError> {
        let kinds: Vec<String> = actions.iter().map(action_kind).collect();
        self.bulks.lock().unwrap().push(kinds.clone());

        if self.fail_next_bulk.swap(false, Ordering::SeqCst) {
            return Err(TransportError::connection("stubbed bulk outage"));
        }

        let failing = self.failing_items.lock().unwrap();
        let items = kinds
            .iter()
            .map(|kind| {
                if failing.contains(kind) {
                    BulkItem::failure(400, json!({"type": "stubbed_item_failure"}))
                } else {
                    BulkItem::success(200)
                }
            })
            .collect();
        Ok(BulkResponse::new(items))
    }

    async fn refresh(&self, indexes: &[IndexName]) -> Result<(), TransportError> {
        self.refreshes
            .lock()
            .unwrap()
            .push(indexes.iter().map(|i| i.as_str().to_owned()).collect());
        if self.fail_next_refresh.swap(false, Ordering::SeqCst) {
            return Err(TransportError::request(503, "stubbed refresh outage"));
        }
        Ok(())
    }
}

fn action_kind(action: &BulkAction) -> String {
    action
        .metadata
        .pointer("/index/_id")
        .and_then(|id| id.as_str())
        .unwrap_or_default()
        .to_owned()
}

/// Kinds that reached the transport as single requests.
pub(crate) fn executed_kinds(transport: &StubTransport) -> Vec<String> {
    transport.single_calls()
}

/// A canned non-bulkable work.
pub(crate) struct StubNonBulkable {
    kind: String,
    refresh_index: Option<IndexName>,
    failure: Option<String>,
    gate: Option<Arc<Notify>>,
}

impl StubNonBulkable {
    /// A work that executes one request and succeeds.
    pub(crate) fn arc(kind: &str) -> Arc<Self> {
        Arc::new(Self {
            kind: kind.to_owned(),
            refresh_index: None,
            failure: None,
            gate: None,
        })
    }

    /// A work that executes one request and then fails.
    pub(crate) fn failing_arc(kind: &str) -> Arc<Self> {
        Arc::new(Self {
            kind: kind.to_owned(),
            refresh_index: None,
            failure: Some(format!("{kind} failed")),
            gate: None,
        })
    }

    /// A successful work that marks `index` dirty.
    pub(crate) fn refreshing_arc(kind: &str, index: &str) -> Arc<Self> {
        Arc::new(Self {
            kind: kind.to_owned(),
            refresh_index: Some(IndexName::new(index)),
            failure: None,
            gate: None,
        })
    }

    /// A successful work that waits on `gate` before executing.
    pub(crate) fn gated_arc(kind: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            kind: kind.to_owned(),
            refresh_index: None,
            failure: None,
            gate: Some(gate),
        })
    }
}

#[async_trait]
impl NonBulkableWork for StubNonBulkable {
    async fn execute(&self, context: &mut dyn WorkExecutionContext) -> WorkResult {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let transport = context.transport().clone();
        transport
            .request(TransportRequest::new(
                RequestMethod::Post,
                format!("/stub/{}", self.kind),
            ))
            .await
            .map_err(WorkError::transport)?;
        if let Some(reason) = &self.failure {
            return Err(WorkError::backend(500, reason.clone()));
        }
        if let Some(index) = &self.refresh_index {
            context.register_index_to_refresh(index.clone());
        }
        Ok(WorkOutcome::Acknowledged)
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new(self.kind.clone())
    }
}

/// A canned bulkable work.
pub(crate) struct StubBulkable {
    kind: String,
    strategy: RefreshStrategy,
    refresh_index: Option<IndexName>,
}

impl StubBulkable {
    pub(crate) fn arc(kind: &str, strategy: RefreshStrategy) -> Arc<Self> {
        Arc::new(Self {
            kind: kind.to_owned(),
            strategy,
            refresh_index: None,
        })
    }

    /// An `Immediate` work that marks `index` dirty on success.
    pub(crate) fn refreshing_arc(kind: &str, index: &str) -> Arc<Self> {
        Arc::new(Self {
            kind: kind.to_owned(),
            strategy: RefreshStrategy::Immediate,
            refresh_index: Some(IndexName::new(index)),
        })
    }

    fn mark_dirty(&self, context: &mut dyn WorkExecutionContext) {
        if self.strategy == RefreshStrategy::Immediate {
            if let Some(index) = &self.refresh_index {
                context.register_index_to_refresh(index.clone());
            }
        }
    }
}

#[async_trait]
impl BulkableWork for StubBulkable {
    async fn execute(&self, context: &mut dyn WorkExecutionContext) -> WorkResult {
        let transport = context.transport().clone();
        transport
            .request(TransportRequest::new(
                RequestMethod::Put,
                format!("/stub/{}", self.kind),
            ))
            .await
            .map_err(WorkError::transport)?;
        self.mark_dirty(context);
        Ok(WorkOutcome::Indexed { created: true })
    }

    fn refresh_strategy(&self) -> RefreshStrategy {
        self.strategy
    }

    fn bulk_action(&self) -> BulkAction {
        BulkAction::new(json!({"index": {"_index": "stub", "_id": self.kind}}))
            .with_payload(json!({"kind": self.kind}))
    }

    fn handle_bulk_item(
        &self,
        context: &mut dyn WorkExecutionContext,
        item: &BulkItem,
    ) -> WorkResult {
        if item.is_success() {
            self.mark_dirty(context);
            Ok(WorkOutcome::Indexed { created: true })
        } else {
            Err(WorkError::backend(item.status, item.failure_reason()))
        }
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new(self.kind.clone())
    }
}

/// Failure handler that stores every report it is handed.
pub(crate) struct RecordingFailureHandler {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingFailureHandler {
    pub(crate) fn arc() -> Arc<Self> {
        Arc::new(Self {
            reports: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn reports(&self) -> Vec<FailureReport> {
        self.reports.lock().unwrap().clone()
    }

    /// The one report this handler should have received.
    pub(crate) fn single_report(&self) -> FailureReport {
        let reports = self.reports.lock().unwrap();
        assert_eq!(reports.len(), 1, "expected exactly one failure report");
        reports[0].clone()
    }
}

impl FailureHandler for RecordingFailureHandler {
    fn handle(&self, report: FailureReport) {
        self.reports.lock().unwrap().push(report);
    }
}
