//! Search transport trait definition.
//!
//! This module defines the abstract interface the orchestration engine uses
//! to reach the document store, allowing for different backend
//! implementations (OpenSearch, Elasticsearch, a test stub, etc.).

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::types::{BulkAction, BulkResponse, TransportRequest, TransportResponse};
use search_writer_shared::IndexName;

/// Abstract interface to the document store's HTTP API.
///
/// The orchestration engine asks each work for its request (or bulk action)
/// and hands it to this trait; the transport owns connections, retries at
/// the HTTP level, and response parsing.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` so that orchestrators can share
/// one transport across async tasks.
///
/// # Error Handling
///
/// A returned `TransportError` means the request failed as a whole. Per-item
/// failures inside a bulk are not transport errors; they are reported through
/// the items of the [`BulkResponse`].
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Execute a single request against the store.
    ///
    /// # Arguments
    ///
    /// * `request` - The method, path, and optional body to send
    ///
    /// # Returns
    ///
    /// The store's response, or a `TransportError` if the call failed.
    async fn request(&self, request: TransportRequest)
        -> Result<TransportResponse, TransportError>;

    /// Execute a bulk request containing the given actions.
    ///
    /// Implementations must preserve action order: the response's items line
    /// up positionally with `actions`.
    ///
    /// # Arguments
    ///
    /// * `actions` - The actions to execute, never empty
    ///
    /// # Returns
    ///
    /// The parsed bulk response, or a `TransportError` if the bulk call
    /// failed as a whole.
    async fn bulk(&self, actions: Vec<BulkAction>) -> Result<BulkResponse, TransportError>;

    /// Refresh the given indexes so recent writes become searchable.
    ///
    /// # Arguments
    ///
    /// * `indexes` - The indexes to refresh, never empty
    async fn refresh(&self, indexes: &[IndexName]) -> Result<(), TransportError>;
}
