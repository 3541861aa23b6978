//! Request and response types for the transport boundary.
//!
//! The bulk types mirror the document store's `_bulk` endpoint: each action
//! is one metadata line optionally followed by one payload line, and the
//! response carries one item per action, in the same order.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method for a single (non-bulk) transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self {
            RequestMethod::Get => "GET",
            RequestMethod::Put => "PUT",
            RequestMethod::Post => "POST",
            RequestMethod::Delete => "DELETE",
        };
        f.write_str(method)
    }
}

/// A single request to the document store.
///
/// Works that cannot be bulked describe their HTTP call with this type and
/// hand it to the transport; the orchestration engine never builds URLs or
/// bodies itself.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: RequestMethod,
    /// Path relative to the store's base URL, e.g. `/entities/_doc/42`.
    pub path: String,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Create a request without a body.
    pub fn new(method: RequestMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The response to a single transport request.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body, when the store returned one.
    pub body: Option<Value>,
}

impl TransportResponse {
    /// Create a response from a status code and optional body.
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One action inside a bulk request.
///
/// On the wire this becomes the action's metadata line (e.g.
/// `{"index": {"_index": "entities", "_id": "42"}}`) followed by the payload
/// line when the action carries a document.
#[derive(Debug, Clone, Serialize)]
pub struct BulkAction {
    /// The metadata line identifying the operation, index, and document.
    pub metadata: Value,
    /// The payload line; `None` for actions like delete that have none.
    pub payload: Option<Value>,
}

impl BulkAction {
    /// Create an action without a payload line.
    pub fn new(metadata: Value) -> Self {
        Self {
            metadata,
            payload: None,
        }
    }

    /// Set the payload line.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// The per-action outcome inside a bulk response.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    /// HTTP-style status code for this single action.
    pub status: u16,
    /// The error object reported by the store, if the action failed.
    pub error: Option<Value>,
}

impl BulkItem {
    /// Create a successful item with the given status.
    pub fn success(status: u16) -> Self {
        Self {
            status,
            error: None,
        }
    }

    /// Create a failed item with the given status and error object.
    pub fn failure(status: u16, error: Value) -> Self {
        Self {
            status,
            error: Some(error),
        }
    }

    /// Whether this action succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    /// A short description of the failure, for logs and error messages.
    pub fn failure_reason(&self) -> String {
        match &self.error {
            Some(error) => error.to_string(),
            None => format!("status {}", self.status),
        }
    }
}

/// The response to a bulk request.
///
/// Items appear in the same order as the submitted actions; callers match
/// them back to their works positionally.
#[derive(Debug, Clone)]
pub struct BulkResponse {
    /// Per-action outcomes, in submission order.
    pub items: Vec<BulkItem>,
    /// Whether any item failed.
    pub errors: bool,
}

impl BulkResponse {
    /// Create a response, deriving the `errors` flag from the items.
    pub fn new(items: Vec<BulkItem>) -> Self {
        let errors = items.iter().any(|item| !item.is_success());
        Self { items, errors }
    }
}
