//! Configuration management module.

mod settings;

pub use settings::{
    BrokerSettings, ConsumerSettings, RetrySettings, Settings, SnowflakeSettings,
};
