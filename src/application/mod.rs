//! Application layer: services, producers, and consumers.

pub mod consumers;
pub mod services;
