//! Dependency initialization and wiring for the search writer.

use std::sync::Arc;

use tracing::info;

use crate::config::OrchestratorSettings;
use crate::SearchWriterError;
use search_writer_orchestration::{
    BatchingWorkOrchestrator, ChangesetOrchestrator, LoggingFailureHandler,
};
use search_writer_transport::SearchTransport;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The running orchestrator, ready to accept submissions.
    pub orchestrator: BatchingWorkOrchestrator,
}

impl Dependencies {
    /// Initialize from environment variables, writing through `transport`.
    ///
    /// Loads a `.env` file when one is present. See
    /// [`OrchestratorSettings::from_env`] for the recognized variables.
    pub fn from_env(transport: Arc<dyn SearchTransport>) -> Result<Self, SearchWriterError> {
        dotenv::dotenv().ok();
        let settings = OrchestratorSettings::from_env()?;
        Ok(Self::with_settings(transport, settings))
    }

    /// Initialize with explicit settings.
    pub fn with_settings(
        transport: Arc<dyn SearchTransport>,
        settings: OrchestratorSettings,
    ) -> Self {
        info!(
            max_bulk_size = settings.max_bulk_size,
            min_bulk_size = settings.min_bulk_size,
            queue_capacity = settings.queue_capacity,
            max_items_per_batch = settings.max_items_per_batch,
            fair = settings.fair,
            "Initializing search writer"
        );

        let mut orchestrator = BatchingWorkOrchestrator::with_config(
            transport,
            settings.to_batching_config(),
            Arc::new(LoggingFailureHandler),
        );
        orchestrator.start();

        info!("Search writer started");

        Self { orchestrator }
    }

    /// Stop admitting new work, then wait until everything already queued
    /// has executed.
    pub async fn shutdown(mut self) {
        self.orchestrator.pre_stop().await;
        self.orchestrator.stop();
    }
}
