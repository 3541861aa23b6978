//! Error types for the search writer transport.

mod transport_error;

pub use transport_error::TransportError;
