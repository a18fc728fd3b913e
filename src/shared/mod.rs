//! Shared utilities: error types and ID generation.

pub mod error;
pub mod snowflake;

pub use error::PipelineError;
