use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ProviderConfig, Tone};
use crate::error::{DocumaticError, Result};
use super::export::{Clipboard, FileSaver, MARKDOWN_CONTENT_TYPE};
use super::llm::{Completion, LlmDocumenter, Prompt};
use super::prompt::PromptBuilder;

/// Progress of the most recent generation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
    Ready,
    Failed,
}

/// What the output pane is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentView {
    Empty,
    Viewing,
    Editing,
}

/// Focused pane on a compact (single pane) surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub source_code: String,
    pub tone: Tone,
}

/// Everything needed to run one accepted generation outside the controller
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub seq: u64,
    pub prompt: Prompt,
    pub config: ProviderConfig,
}

/// Whether a finished generation was applied or dropped as superseded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Accepted,
    Stale,
}

/// Owns the observable state of the tool and drives the provider adapter.
///
/// Generations are numbered; only the completion matching the newest number
/// is applied, so a slow earlier request can never overwrite a later one.
pub struct Controller {
    documenter: Arc<dyn LlmDocumenter>,
    config: ProviderConfig,
    prompt_builder: PromptBuilder,

    source_code: String,
    tone: Tone,

    phase: Phase,
    latest_seq: u64,
    last_error: Option<String>,

    /// Latest successful generation, as returned by the provider
    result: Option<Completion>,

    /// Document of record
    document: Option<String>,

    /// Present only while editing
    draft: Option<String>,

    compact: bool,
    focus: Pane,
    notifications: Vec<Notification>,
}

impl Controller {
    pub fn new(
        documenter: Arc<dyn LlmDocumenter>,
        config: ProviderConfig,
        prompt_builder: PromptBuilder,
    ) -> Self {
        Self {
            documenter,
            config,
            prompt_builder,
            source_code: String::new(),
            tone: Tone::default(),
            phase: Phase::Idle,
            latest_seq: 0,
            last_error: None,
            result: None,
            document: None,
            draft: None,
            compact: false,
            focus: Pane::Input,
            notifications: Vec::new(),
        }
    }

    pub fn documenter(&self) -> Arc<dyn LlmDocumenter> {
        Arc::clone(&self.documenter)
    }

    // Input

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn set_source_code(&mut self, source_code: impl Into<String>) {
        self.source_code = source_code.into();
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.tone = tone;
    }

    /// Request built from the current input and tone
    pub fn current_request(&self) -> GenerationRequest {
        GenerationRequest {
            source_code: self.source_code.clone(),
            tone: self.tone,
        }
    }

    // Generation

    /// Generate from `request` and wait for the provider.
    pub async fn generate(&mut self, request: GenerationRequest) -> Result<()> {
        let ticket = self.start_generation(request)?;
        let outcome = self.documenter.generate(&ticket.prompt, &ticket.config).await;

        match outcome {
            Ok(completion) => {
                self.finish_generation(ticket.seq, Ok(completion));
                Ok(())
            }
            Err(err) => {
                self.record_failure(ticket.seq, &err);
                Err(err)
            }
        }
    }

    /// Validate `request` and move to `Generating`.
    ///
    /// The returned ticket snapshots the prompt and provider configuration, so
    /// the caller can run it on any task and hand the outcome back through
    /// [`Controller::finish_generation`].
    pub fn start_generation(&mut self, request: GenerationRequest) -> Result<GenerationTicket> {
        if request.source_code.trim().is_empty() {
            let err = DocumaticError::Validation("Please enter some code first".to_string());
            self.notify_error(err.user_message());
            return Err(err);
        }

        let prompt = match self.prompt_builder.build(&request.source_code, request.tone) {
            Ok(prompt) => prompt,
            Err(err) => {
                self.notify_error(err.user_message());
                return Err(err);
            }
        };

        self.latest_seq += 1;
        self.draft = None;
        self.last_error = None;
        self.phase = Phase::Generating;

        info!(
            "Starting generation #{} with {} ({} tone)",
            self.latest_seq, self.config.provider, request.tone
        );

        Ok(GenerationTicket {
            seq: self.latest_seq,
            prompt,
            config: self.config.clone(),
        })
    }

    /// Apply the outcome of the generation numbered `seq`
    pub fn finish_generation(&mut self, seq: u64, outcome: Result<Completion>) -> Applied {
        match outcome {
            Ok(completion) => self.record_success(seq, completion),
            Err(err) => self.record_failure(seq, &err),
        }
    }

    fn is_current(&self, seq: u64) -> bool {
        if seq != self.latest_seq || self.phase != Phase::Generating {
            debug!("Dropping stale completion #{} (latest is #{})", seq, self.latest_seq);
            return false;
        }
        true
    }

    fn record_success(&mut self, seq: u64, completion: Completion) -> Applied {
        if !self.is_current(seq) {
            return Applied::Stale;
        }

        info!("Generation #{} succeeded ({} chars)", seq, completion.cleaned_text.len());
        self.document = Some(completion.cleaned_text.clone());
        self.result = Some(completion);
        self.draft = None;
        self.phase = Phase::Ready;
        self.notify_success("Documentation Generated!");

        if self.compact {
            self.focus = Pane::Output;
        }
        Applied::Accepted
    }

    fn record_failure(&mut self, seq: u64, err: &DocumaticError) -> Applied {
        if !self.is_current(seq) {
            return Applied::Stale;
        }

        let message = err.user_message();
        warn!("Generation #{} failed: {}", seq, message);
        self.phase = Phase::Failed;
        self.last_error = Some(message.clone());
        self.notify_error(message);
        Applied::Accepted
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Generating
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Raw and cleaned text of the latest successful generation
    pub fn last_result(&self) -> Option<&Completion> {
        self.result.as_ref()
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    // Editing

    pub fn view(&self) -> DocumentView {
        match (&self.document, &self.draft) {
            (None, _) => DocumentView::Empty,
            (Some(_), None) => DocumentView::Viewing,
            (Some(_), Some(_)) => DocumentView::Editing,
        }
    }

    /// "Ready" once a document exists, "Empty" before
    pub fn preview_status(&self) -> &'static str {
        if self.document.is_some() {
            "Ready"
        } else {
            "Empty"
        }
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    /// Enter editing with a draft copied from the document
    pub fn begin_edit(&mut self) -> bool {
        if self.view() != DocumentView::Viewing || self.is_loading() {
            return false;
        }
        self.draft = self.document.clone();
        true
    }

    pub fn update_draft(&mut self, text: impl Into<String>) -> bool {
        match self.draft.as_mut() {
            Some(draft) => {
                *draft = text.into();
                true
            }
            None => false,
        }
    }

    /// Leave editing and throw the draft away
    pub fn cancel_edit(&mut self) -> bool {
        self.draft.take().is_some()
    }

    /// Leave editing, replacing the document with the draft
    pub fn save_edit(&mut self) -> bool {
        let Some(draft) = self.draft.take() else {
            return false;
        };
        self.document = Some(draft);
        self.notify_success("Changes saved locally");
        true
    }

    // Export

    /// Copy the document; does nothing before the first generation
    pub fn export_text(&mut self, clipboard: &dyn Clipboard) -> bool {
        let Some(document) = self.document.as_deref() else {
            return false;
        };

        match clipboard.copy_text(document) {
            Ok(()) => {
                self.notify_success("Copied to clipboard");
                true
            }
            Err(err) => {
                self.notify_error(err.user_message());
                false
            }
        }
    }

    /// Save the document as `file_name`; does nothing before the first generation
    pub fn export_file(&mut self, saver: &dyn FileSaver, file_name: &str) -> Option<PathBuf> {
        let document = self.document.as_deref()?;

        match saver.save_file(file_name, MARKDOWN_CONTENT_TYPE, document) {
            Ok(path) => {
                self.notify_success(format!("Downloaded {}", file_name));
                Some(path)
            }
            Err(err) => {
                self.notify_error(err.user_message());
                None
            }
        }
    }

    // Settings and layout

    pub fn provider_config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Replace the provider settings used by future generations
    pub fn update_provider_config(&mut self, config: ProviderConfig) {
        debug!("Provider set to {}", config.provider);
        self.config = config;
    }

    pub fn set_compact(&mut self, compact: bool) {
        self.compact = compact;
    }

    pub fn focus(&self) -> Pane {
        self.focus
    }

    pub fn set_focus(&mut self, pane: Pane) {
        self.focus = pane;
    }

    // Notifications

    pub fn notify_success(&mut self, message: impl Into<String>) {
        self.notifications.push(Notification::Success(message.into()));
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.notifications.push(Notification::Error(message.into()));
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
