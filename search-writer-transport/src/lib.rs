//! # Search Writer Transport
//!
//! This crate defines the boundary between the write orchestration engine
//! and the document store's HTTP API. It includes the request and response
//! types for single and bulk operations, the transport errors, and the
//! abstract `SearchTransport` trait that concrete HTTP clients implement.

pub mod errors;
pub mod interfaces;
pub mod types;

pub use errors::TransportError;
pub use interfaces::SearchTransport;
pub use types::{
    BulkAction, BulkItem, BulkResponse, RequestMethod, TransportRequest, TransportResponse,
};
