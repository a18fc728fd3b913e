//! In-memory user directory.
//!
//! Stand-in for the authenticated-identity collaborator: the pipeline only
//! asks whether a referenced user exists.

use async_trait::async_trait;
use dashmap::DashSet;

use crate::domain::entities::UserDirectory;
use crate::shared::error::PipelineError;

/// In-memory `UserDirectory` implementation.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashSet<String>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: impl Into<String>) {
        self.users.insert(user_id.into());
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, user_id: &str) -> Result<bool, PipelineError> {
        Ok(self.users.contains(user_id))
    }
}
