//! The bulk work assembled by the bulker.

use std::sync::Arc;

use tracing::debug;

use crate::context::WorkExecutionContext;
use crate::errors::WorkError;
use crate::work::BulkableWork;
use search_writer_shared::RefreshStrategy;
use search_writer_transport::{BulkResponse, TransportError};

/// A group of bulkable works executed as one bulk request.
///
/// The bulk work itself only owns the request round-trip; interpreting the
/// per-item outcomes stays with the member works, which the sequence calls
/// one by one with their positional items.
pub(crate) struct BulkWork {
    works: Vec<Arc<dyn BulkableWork>>,
    strategy: RefreshStrategy,
}

impl BulkWork {
    /// Create a bulk over the given works. All works share `strategy`; the
    /// bulker guarantees it never mixes strategies in one bulk.
    pub(crate) fn new(works: Vec<Arc<dyn BulkableWork>>, strategy: RefreshStrategy) -> Self {
        Self { works, strategy }
    }

    /// Execute the bulk request and return the store's response.
    ///
    /// Fails when the transport fails or when the response does not carry
    /// exactly one item per submitted action; per-item failures are left in
    /// the response for the member works to interpret.
    pub(crate) async fn execute(
        &self,
        context: &mut dyn WorkExecutionContext,
    ) -> Result<BulkResponse, WorkError> {
        let actions = self.works.iter().map(|work| work.bulk_action()).collect::<Vec<_>>();
        debug!(works = actions.len(), strategy = ?self.strategy, "Executing bulk request");

        let transport = context.transport().clone();
        let response = transport.bulk(actions).await.map_err(WorkError::transport)?;

        if response.items.len() != self.works.len() {
            return Err(WorkError::transport(TransportError::invalid_response(
                format!(
                    "bulk response carries {} items for {} actions",
                    response.items.len(),
                    self.works.len()
                ),
            )));
        }
        Ok(response)
    }
}
