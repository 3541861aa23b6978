//! Interface definitions for the search transport.
//!
//! This module defines the abstract `SearchTransport` trait that allows
//! for dependency injection and swappable document store implementations.

mod search_transport;

pub use search_transport::SearchTransport;
