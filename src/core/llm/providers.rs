use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{Provider, ProviderConfig};
use crate::core::cleanup::ResponseCleaner;
use crate::error::{DocumaticError, Result};
use super::documenter::{Completion, CredentialCheck, LlmDocumenter, Prompt};

/// Longest slice of an error body carried into a message
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP adapter covering every supported provider
pub struct ProviderAdapter {
    client: reqwest::Client,
    cleaner: ResponseCleaner,
    min_response_chars: usize,
}

impl ProviderAdapter {
    pub fn new(timeout: Duration, min_response_chars: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DocumaticError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cleaner: ResponseCleaner::new(),
            min_response_chars,
        })
    }

    /// Perform the single outbound call and return the provider's raw text
    async fn complete(&self, prompt: &Prompt, config: &ProviderConfig) -> Result<String> {
        match config.provider {
            Provider::Pollinations => self.call_pollinations(prompt, config).await,
            Provider::HuggingFace => self.call_hugging_face(prompt, config).await,
            Provider::OpenRouter | Provider::Together => {
                self.call_chat_completions(prompt, config).await
            }
            Provider::Gemini => self.call_gemini(prompt, config).await,
        }
    }

    async fn call_pollinations(&self, prompt: &Prompt, config: &ProviderConfig) -> Result<String> {
        let url = format!("{}/", config.base_url());
        let request = self.client.post(&url).json(&request_body(prompt, config));

        let response = send(config.provider, &url, request).await?;
        let body = response.text().await?;
        extract_text(config.provider, &body)
    }

    async fn call_hugging_face(&self, prompt: &Prompt, config: &ProviderConfig) -> Result<String> {
        let api_key = config.require_api_key()?;
        let url = format!("{}/models/{}", config.base_url(), config.model());
        let request = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request_body(prompt, config));

        let response = send(config.provider, &url, request).await?;
        let body = response.text().await?;
        extract_text(config.provider, &body)
    }

    /// OpenRouter and Together share the OpenAI chat-completions shape
    async fn call_chat_completions(&self, prompt: &Prompt, config: &ProviderConfig) -> Result<String> {
        let api_key = config.require_api_key()?;
        let url = format!("{}/chat/completions", config.base_url());
        let request = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request_body(prompt, config));

        let response = send(config.provider, &url, request).await?;
        let body = response.text().await?;
        extract_text(config.provider, &body)
    }

    async fn call_gemini(&self, prompt: &Prompt, config: &ProviderConfig) -> Result<String> {
        let api_key = config.require_api_key()?;
        let url = format!("{}/models/{}:generateContent", config.base_url(), config.model());
        let request = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request_body(prompt, config));

        let response = send(config.provider, &url, request).await?;
        let body = response.text().await?;
        extract_text(config.provider, &body)
    }
}

#[async_trait]
impl LlmDocumenter for ProviderAdapter {
    async fn generate(&self, prompt: &Prompt, config: &ProviderConfig) -> Result<Completion> {
        let raw_text = self.complete(prompt, config).await?;
        let cleaned_text = self.cleaner.clean(&raw_text);

        // Cleanup only removes text, so this also covers short raw responses.
        if cleaned_text.trim().chars().count() < self.min_response_chars {
            warn!(
                "{} returned a degenerate response ({} bytes raw, {} after cleanup)",
                config.provider,
                raw_text.len(),
                cleaned_text.len()
            );
            return Err(DocumaticError::provider(
                config.provider,
                None,
                "Generated content empty.",
            ));
        }

        Ok(Completion {
            raw_text,
            cleaned_text,
            generated_at: Utc::now(),
        })
    }

    async fn check_credentials(&self, config: &ProviderConfig) -> Result<CredentialCheck> {
        let (url, request, failure) = match config.provider {
            Provider::HuggingFace => {
                let url = format!("{}/models/{}", config.base_url(), config.model());
                let request = self
                    .client
                    .post(&url)
                    .bearer_auth(config.require_api_key()?)
                    .json(&json!({ "inputs": "Test" }));
                (url, request, "Invalid HF Key")
            }
            Provider::OpenRouter => {
                let url = format!("{}/auth/key", config.base_url());
                let request = self.client.get(&url).bearer_auth(config.require_api_key()?);
                (url, request, "Invalid OpenRouter Key")
            }
            other => {
                debug!("No credential check available for {}", other);
                return Ok(CredentialCheck::Skipped);
            }
        };

        debug!("Checking {} credentials against {}", config.provider, url);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DocumaticError::provider(
                config.provider,
                Some(status.as_u16()),
                failure,
            ));
        }

        info!("{} credentials verified", config.provider);
        Ok(CredentialCheck::Verified)
    }
}

/// Send a prepared request and turn non-2xx statuses into provider errors
async fn send(provider: Provider, url: &str, request: RequestBuilder) -> Result<Response> {
    info!("Requesting completion from {} at {}", provider, url);
    let response = request.send().await?;
    let status = response.status();
    debug!("{} responded with {}", provider, status);

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail: String = body.trim().chars().take(ERROR_BODY_LIMIT).collect();
    let message = if detail.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        detail
    };

    Err(DocumaticError::provider(provider, Some(status.as_u16()), message))
}

/// JSON body a provider expects for the given prompt
pub fn request_body(prompt: &Prompt, config: &ProviderConfig) -> Value {
    match config.provider {
        Provider::Pollinations => json!({
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user }
            ],
            "model": config.model(),
            "jsonMode": false
        }),
        Provider::HuggingFace => json!({
            "inputs": prompt.combined(),
            "parameters": {
                "max_new_tokens": 1500,
                "return_full_text": false
            }
        }),
        Provider::OpenRouter | Provider::Together => json!({
            "model": config.model(),
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user }
            ]
        }),
        Provider::Gemini => json!({
            "contents": [
                { "parts": [ { "text": prompt.combined() } ] }
            ]
        }),
    }
}

/// Pull the completion text out of a successful response body.
///
/// Missing fields yield an empty string; only an unparseable body is an error.
pub fn extract_text(provider: Provider, body: &str) -> Result<String> {
    let text = match provider {
        Provider::Pollinations => return Ok(body.to_string()),
        Provider::HuggingFace => {
            let data = parse_json(provider, body)?;
            let item = match &data {
                Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
                other => other.clone(),
            };
            string_at(&item["generated_text"])
        }
        Provider::OpenRouter | Provider::Together => {
            let data = parse_json(provider, body)?;
            string_at(&data["choices"][0]["message"]["content"])
        }
        Provider::Gemini => {
            let data = parse_json(provider, body)?;
            string_at(&data["candidates"][0]["content"]["parts"][0]["text"])
        }
    };

    Ok(text)
}

fn parse_json(provider: Provider, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| {
        DocumaticError::provider(provider, None, format!("Failed to parse response: {}", e))
    })
}

fn string_at(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}
