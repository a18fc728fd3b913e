//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Root configuration structure containing all pipeline settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Broker configuration (partitioning, polling)
    pub broker: BrokerSettings,

    /// Consumer group configuration
    pub consumer: ConsumerSettings,

    /// Retry / dead-letter policy
    pub retry: RetrySettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Broker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    /// Number of partitions per topic
    pub partitions: u32,

    /// Delay between empty polls in milliseconds
    pub poll_interval_ms: u64,

    /// Maximum records returned by a single poll
    pub max_poll_records: usize,

    /// Maximum records per poll on batch topics (smaller: each record
    /// already carries a list of events)
    pub batch_max_poll_records: usize,
}

/// Consumer group configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerSettings {
    /// Parallel worker tasks per consumer group
    pub workers: usize,

    /// Parallel worker tasks for batch topic groups
    pub batch_workers: usize,
}

/// Retry policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Total retry attempts before dead-lettering
    pub max_attempts: u32,

    /// Fixed backoff between attempts in milliseconds
    pub backoff_ms: u64,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-31)
    pub machine_id: u16,

    /// Custom epoch timestamp in milliseconds
    pub epoch: u64,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("broker.partitions", 3)?
            .set_default("broker.poll_interval_ms", 25_i64)?
            .set_default("broker.max_poll_records", 500_i64)?
            .set_default("broker.batch_max_poll_records", 50_i64)?
            .set_default("consumer.workers", 3_i64)?
            .set_default("consumer.batch_workers", 2_i64)?
            .set_default("retry.max_attempts", 3_i64)?
            .set_default("retry.backoff_ms", 1000_i64)?
            .set_default("snowflake.machine_id", 1)?
            .set_default("snowflake.epoch", 1420070400000_u64)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__RETRY__MAX_ATTEMPTS=5 -> retry.max_attempts = 5
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                if settings.broker.partitions == 0 {
                    return Err(ConfigError::Message(
                        "broker.partitions must be at least 1".into(),
                    ));
                }
                if settings.consumer.workers == 0 || settings.consumer.batch_workers == 0 {
                    return Err(ConfigError::Message(
                        "consumer worker counts must be at least 1".into(),
                    ));
                }
                Ok(settings)
            })
    }
}

impl BrokerSettings {
    /// Delay between empty polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl RetrySettings {
    /// Fixed backoff between retry attempts.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}
