//! # Search Writer Shared
//!
//! This crate provides the types shared across the search writer system:
//! index names, refresh strategies, and the descriptive metadata that
//! travels with every unit of write work.

pub mod types;

pub use types::{IndexName, RefreshStrategy, WorkInfo, WorkOutcome};
