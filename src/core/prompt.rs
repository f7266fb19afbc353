use tera::{Context, Tera};

use crate::config::Tone;
use crate::core::llm::Prompt;
use crate::error::Result;

const DEFAULT_SYSTEM_TEMPLATE: &str = "You are a technical writer. Write a README.md for this code.
Tone: {{ tone }}.
Sections: Title, Description, Features, Tech Stack, Installation, Usage.
Return ONLY Markdown.";

/// Builds the system/user prompt pair for a generation request
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_template: String,
}

impl PromptBuilder {
    pub fn new(system_template: Option<&str>) -> Self {
        Self {
            system_template: system_template.unwrap_or(DEFAULT_SYSTEM_TEMPLATE).to_string(),
        }
    }

    pub fn build(&self, source_code: &str, tone: Tone) -> Result<Prompt> {
        let mut context = Context::new();
        context.insert("tone", &tone.to_string());

        let system = Tera::one_off(&self.system_template, &context, false)?;
        let user = format!("Code: \n\n{} ", source_code);

        Ok(Prompt { system, user })
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(None)
    }
}
