//! Shared fixtures: an in-memory transport that records every call in
//! arrival order, document works built on the public work traits, and a
//! failure handler that keeps reports for assertions.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use search_writer_orchestration::{
    BulkableWork, FailureHandler, FailureReport, NonBulkableWork, Work, WorkError,
    WorkExecutionContext, WorkResult,
};
use search_writer_shared::{IndexName, RefreshStrategy, WorkInfo, WorkOutcome};
use search_writer_transport::{
    BulkAction, BulkItem, BulkResponse, RequestMethod, SearchTransport, TransportError,
    TransportRequest, TransportResponse,
};

/// Transport that records every call and serves canned success responses.
///
/// Bulk entries are logged as `bulk index/id,index/id`, single requests as
/// `METHOD /path`, refreshes as `refresh index,index`, so tests can assert
/// the exact call order with one comparison.
#[derive(Default)]
pub struct RecordingTransport {
    log: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every bulk containing `index/id` report a per-item failure for
    /// that document.
    pub fn fail_document(&self, index: &str, id: &str) {
        self.failing.lock().unwrap().insert(format!("{index}/{id}"));
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// The `index/id` labels of each bulk call, in order.
    pub fn bulked_ids(&self) -> Vec<Vec<String>> {
        self.calls()
            .iter()
            .filter_map(|entry| entry.strip_prefix("bulk "))
            .map(|ids| ids.split(',').map(str::to_owned).collect())
            .collect()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

fn action_label(action: &BulkAction) -> String {
    let fields = action
        .metadata
        .as_object()
        .and_then(|operations| operations.values().next())
        .and_then(Value::as_object);
    let index = fields
        .and_then(|fields| fields.get("_index"))
        .and_then(Value::as_str)
        .unwrap_or("?");
    let id = fields
        .and_then(|fields| fields.get("_id"))
        .and_then(Value::as_str)
        .unwrap_or("?");
    format!("{index}/{id}")
}

#[async_trait]
impl SearchTransport for RecordingTransport {
    async fn request(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.record(format!("{} {}", request.method, request.path));
        Ok(TransportResponse::new(200, None))
    }

    async fn bulk(&self, actions: Vec<BulkAction>) -> Result<BulkResponse, TransportError> {
        let labels: Vec<String> = actions.iter().map(action_label).collect();
        self.record(format!("bulk {}", labels.join(",")));
        let failing = self.failing.lock().unwrap();
        let items = labels
            .iter()
            .map(|label| {
                if failing.contains(label) {
                    BulkItem::failure(429, json!({"type": "rejected_execution_exception"}))
                } else {
                    BulkItem::success(200)
                }
            })
            .collect();
        Ok(BulkResponse::new(items))
    }

    async fn refresh(&self, indexes: &[IndexName]) -> Result<(), TransportError> {
        let names: Vec<&str> = indexes.iter().map(IndexName::as_str).collect();
        self.record(format!("refresh {}", names.join(",")));
        Ok(())
    }
}

/// A bulkable work that indexes one JSON document.
pub struct IndexDocument {
    index: IndexName,
    id: String,
    body: Value,
    refresh: RefreshStrategy,
}

impl IndexDocument {
    pub fn work(index: &str, id: &str, body: Value) -> Work {
        Work::bulkable(Self {
            index: IndexName::new(index),
            id: id.to_owned(),
            body,
            refresh: RefreshStrategy::None,
        })
    }

    /// Same, but requiring the touched index to be refreshed once the
    /// changeset completes.
    pub fn refreshing(index: &str, id: &str, body: Value) -> Work {
        Work::bulkable(Self {
            index: IndexName::new(index),
            id: id.to_owned(),
            body,
            refresh: RefreshStrategy::Immediate,
        })
    }

    fn mark_refresh(&self, context: &mut dyn WorkExecutionContext) {
        if self.refresh == RefreshStrategy::Immediate {
            context.register_index_to_refresh(self.index.clone());
        }
    }
}

#[async_trait]
impl BulkableWork for IndexDocument {
    async fn execute(&self, context: &mut dyn WorkExecutionContext) -> WorkResult {
        let transport = context.transport().clone();
        let request = TransportRequest::new(
            RequestMethod::Put,
            format!("/{}/_doc/{}", self.index, self.id),
        )
        .with_body(self.body.clone());
        let response = transport.request(request).await.map_err(WorkError::transport)?;
        if !response.is_success() {
            return Err(WorkError::backend(response.status, "index rejected"));
        }
        self.mark_refresh(context);
        Ok(WorkOutcome::Indexed { created: true })
    }

    fn refresh_strategy(&self) -> RefreshStrategy {
        self.refresh
    }

    fn bulk_action(&self) -> BulkAction {
        BulkAction::new(json!({"index": {"_index": self.index.as_str(), "_id": self.id}}))
            .with_payload(self.body.clone())
    }

    fn handle_bulk_item(
        &self,
        context: &mut dyn WorkExecutionContext,
        item: &BulkItem,
    ) -> WorkResult {
        if !item.is_success() {
            return Err(WorkError::backend(item.status, item.failure_reason()));
        }
        self.mark_refresh(context);
        Ok(WorkOutcome::Indexed { created: true })
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new("index")
            .with_index(self.index.clone())
            .with_document_id(&self.id)
    }
}

/// A non-bulkable work that deletes every document in an index.
pub struct PurgeIndex {
    index: IndexName,
}

impl PurgeIndex {
    pub fn work(index: &str) -> Work {
        Work::non_bulkable(Self {
            index: IndexName::new(index),
        })
    }
}

#[async_trait]
impl NonBulkableWork for PurgeIndex {
    async fn execute(&self, context: &mut dyn WorkExecutionContext) -> WorkResult {
        let transport = context.transport().clone();
        let request = TransportRequest::new(
            RequestMethod::Post,
            format!("/{}/_delete_by_query", self.index),
        )
        .with_body(json!({"query": {"match_all": {}}}));
        let response = transport.request(request).await.map_err(WorkError::transport)?;
        if !response.is_success() {
            return Err(WorkError::backend(response.status, "purge rejected"));
        }
        Ok(WorkOutcome::Acknowledged)
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new("purge").with_index(self.index.clone())
    }
}

/// Failure handler that stores reports for assertions.
#[derive(Default)]
pub struct RecordingHandler {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingHandler {
    pub fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl FailureHandler for RecordingHandler {
    fn handle(&self, report: FailureReport) {
        self.reports.lock().unwrap().push(report);
    }
}
