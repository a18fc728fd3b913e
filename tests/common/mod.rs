//! Shared test harness: a wired pipeline with fast polling.
#![allow(dead_code, unused_imports, unused_macros)]

use fanout_pipeline::config::Settings;
use fanout_pipeline::startup::Pipeline;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Settings tuned for tests: tight polling, short backoff.
pub fn test_settings() -> Settings {
    let mut settings = Settings::load().expect("defaults should load");
    settings.broker.poll_interval_ms = 5;
    settings.retry.backoff_ms = 10;
    settings
}

/// A running pipeline with its consumer groups started.
pub struct TestApp {
    pub pipeline: Pipeline,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl TestApp {
    pub fn start() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let pipeline = Pipeline::build(settings);
        let (shutdown, rx) = watch::channel(false);
        let handles = pipeline.spawn_consumers(rx);
        Self {
            pipeline,
            shutdown,
            handles,
        }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            handle.await.expect("worker task panicked");
        }
    }
}

/// Await a condition, polling every few milliseconds, panicking after two
/// seconds. The condition expression may itself await.
macro_rules! wait_until {
    ($cond:expr) => {{
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
        while !$cond {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not met in time: {}",
                stringify!($cond)
            );
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }};
}
pub(crate) use wait_until;
