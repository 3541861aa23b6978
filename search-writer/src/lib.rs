//! # Search Writer
//!
//! Embedding layer for the search writer engine.
//!
//! This crate wires the orchestration engine together from environment
//! configuration and hands the embedding service a running orchestrator.
//! The service supplies the transport that reaches its document store.

pub mod config;
pub mod telemetry;

pub use config::{Dependencies, OrchestratorSettings};

use thiserror::Error;

/// Errors that can occur while setting up or using the search writer.
#[derive(Error, Debug)]
pub enum SearchWriterError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Submission rejected by the orchestrator.
    #[error("Submit error: {0}")]
    SubmitError(#[from] search_writer_orchestration::SubmitError),

    /// Transport error.
    #[error("Transport error: {0}")]
    TransportError(#[from] search_writer_transport::TransportError),
}

impl SearchWriterError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
