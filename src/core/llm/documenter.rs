use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::Result;

/// The normalized prompt pair every provider receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Instructions for the model
    pub system: String,

    /// The pasted source code, wrapped for the model
    pub user: String,
}

impl Prompt {
    /// System and user text as a single block, for providers without chat roles
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Text returned by a provider, before and after cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub raw_text: String,
    pub cleaned_text: String,
    pub generated_at: DateTime<Utc>,
}

/// Outcome of a credential check against a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCheck {
    Verified,
    /// The provider has no cheap way to verify a key
    Skipped,
}

/// Anything that can turn a prompt into README text.
///
/// One attempt per call; failures are returned, never retried.
#[async_trait::async_trait]
pub trait LlmDocumenter: Send + Sync {
    async fn generate(&self, prompt: &Prompt, config: &ProviderConfig) -> Result<Completion>;

    async fn check_credentials(&self, config: &ProviderConfig) -> Result<CredentialCheck>;
}
