//! Transport error types.
//!
//! This module defines the errors that can occur while talking to the
//! document store over HTTP.

use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to establish a connection to the document store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request reached the store but failed as a whole.
    #[error("Request failed with status {status}: {reason}")]
    RequestError {
        /// HTTP status code reported by the store.
        status: u16,
        /// Reason phrase or error body extracted from the response.
        reason: String,
    },

    /// The request did not complete within the configured deadline.
    #[error("Request timed out: {0}")]
    TimeoutError(String),

    /// The store's response could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Failed to serialize a request body.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl TransportError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a request error from a status code and reason.
    pub fn request(status: u16, reason: impl Into<String>) -> Self {
        Self::RequestError {
            status,
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::TimeoutError(msg.into())
    }

    /// Create an invalid response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}
