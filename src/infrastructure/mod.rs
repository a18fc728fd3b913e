//! Infrastructure layer: broker, store implementations, metrics.

pub mod broker;
pub mod metrics;
pub mod repositories;
