//! Pipeline Error Types
//!
//! Centralized error handling for the produce/consume paths.
//!
//! The consumer escalation logic only distinguishes two classes of failure:
//! transient errors, which are worth spending retry budget on, and permanent
//! errors (a referenced user or post does not exist), which go straight to
//! the dead-letter topic.

/// Pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl PipelineError {
    /// Whether retrying can ever succeed.
    ///
    /// Permanent failures (dangling user/post references, malformed
    /// payloads, access violations) are dead-lettered immediately instead
    /// of burning retry budget.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            PipelineError::Resolution(_)
                | PipelineError::Serialization(_)
                | PipelineError::NotFound(_)
                | PipelineError::Forbidden(_)
        )
    }

    /// Short classification label used in logs and metrics.
    pub fn class(&self) -> &'static str {
        match self {
            PipelineError::Broker(_) => "broker",
            PipelineError::Serialization(_) => "serialization",
            PipelineError::Handler(_) => "handler",
            PipelineError::Resolution(_) => "resolution",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::Forbidden(_) => "forbidden",
            PipelineError::Config(_) => "config",
        }
    }
}
