//! In-process documenter used by controller and session tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;

use crate::config::ProviderConfig;
use crate::error::{DocumaticError, Result};
use super::documenter::{Completion, CredentialCheck, LlmDocumenter, Prompt};

/// Echoes the code back as a README; fails when the code contains "FAIL".
/// Code containing "slow" takes longer to answer.
#[derive(Default)]
pub struct FakeDocumenter {
    calls: AtomicUsize,
}

impl FakeDocumenter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn completion(text: &str) -> Completion {
    Completion {
        raw_text: format!("```markdown\n{}```", text),
        cleaned_text: text.to_string(),
        generated_at: Utc::now(),
    }
}

#[async_trait::async_trait]
impl LlmDocumenter for FakeDocumenter {
    async fn generate(&self, prompt: &Prompt, config: &ProviderConfig) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.user.contains("slow") {
            tokio::time::sleep(Duration::from_millis(80)).await;
        }
        if prompt.user.contains("FAIL") {
            return Err(DocumaticError::provider(config.provider, Some(500), "boom"));
        }
        Ok(completion(&format!("# README\n{}\n", prompt.user.trim())))
    }

    async fn check_credentials(&self, _config: &ProviderConfig) -> Result<CredentialCheck> {
        Ok(CredentialCheck::Skipped)
    }
}
