//! Error types for the orchestration engine.

mod submit_error;
mod work_error;

pub use submit_error::SubmitError;
pub use work_error::WorkError;
