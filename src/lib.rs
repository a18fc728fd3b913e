//! # Fanout Pipeline
//!
//! An event-driven notification and chat fan-out pipeline built on a
//! partitioned, at-least-once event log:
//! - Typed notification topics with per-recipient ordering
//! - Bounded retries with a fixed backoff and a dead-letter topic
//! - Batch fan-out records retried as a single unit
//! - Two-party chat rooms with monotonic read cursors
//! - Presence fan-out and per-user push channels
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Events, entities, store traits, and topic routing
//! - **Application Layer**: Producers, services, and consumer worker pools
//! - **Infrastructure Layer**: Broker and store implementations, metrics
//! - **Presentation Layer**: The per-user push edge
//!
//! ## Module Structure
//!
//! ```text
//! fanout_pipeline/
//! +-- config/        Configuration management
//! +-- domain/        Events, entities, store traits, topic routing
//! +-- application/   Producers, services, consumer groups
//! +-- infrastructure/ Broker, in-memory stores, metrics
//! +-- presentation/  Push gateway
//! +-- shared/        Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Events, entities, and routing
pub mod domain;

// Application layer - Producers, services, consumers
pub mod application;

// Infrastructure layer - Broker and store implementations
pub mod infrastructure;

// Presentation layer - Push edge
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and wiring
pub mod startup;

// Telemetry and observability
pub mod telemetry;
