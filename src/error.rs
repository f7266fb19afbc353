use thiserror::Error;

use crate::config::Provider;

/// Main error type for Documatic operations
#[derive(Error, Debug)]
pub enum DocumaticError {
    /// Input rejected before any network call was attempted
    #[error("{0}")]
    Validation(String),

    #[error("{provider} error{}: {message}", fmt_status(.status))]
    Provider {
        provider: Provider,
        status: Option<u16>,
        message: String,
    },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("An API key is required for {provider}")]
    MissingApiKey { provider: Provider },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Export failed: {0}")]
    Export(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" {}", code),
        None => String::new(),
    }
}

impl DocumaticError {
    pub fn provider(provider: Provider, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            status,
            message: message.into(),
        }
    }

    /// Text shown to the user when a generation attempt fails
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(detail) if detail.trim().is_empty() => "Network error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for DocumaticError {
    fn from(err: reqwest::Error) -> Self {
        // Drop the URL so a Gemini key never leaks into messages or logs.
        let err = err.without_url();
        if err.is_timeout() {
            Self::Transport("request timed out".to_string())
        } else if err.is_connect() {
            Self::Transport("could not connect to the provider".to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, DocumaticError>;
