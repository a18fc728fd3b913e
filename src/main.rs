//! # Fanout Pipeline
//!
//! Entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Broker, stores, and services
//! - Consumer groups for every topic

use anyhow::Result;
use tracing::info;

use fanout_pipeline::config::Settings;
use fanout_pipeline::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    fanout_pipeline::telemetry::init_tracing();

    info!("Starting fanout pipeline...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        partitions = settings.broker.partitions,
        workers = settings.consumer.workers,
        environment = %settings.environment,
        "Configuration loaded"
    );

    // Wire the pipeline and start every consumer group
    let application = Application::build(settings);

    info!("Consumer groups running");
    application.run_until_stopped().await?;

    Ok(())
}
