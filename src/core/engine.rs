// src/core/engine.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::config::{Config, Provider, ProviderConfig, Tone};
use super::controller::{Controller, Notification};
use super::export::{DirectorySaver, TerminalClipboard};
use super::llm::{CredentialCheck, LlmDocumenter, ProviderAdapter};
use super::prompt::PromptBuilder;
use super::session::Session;

/// Changes requested by `config set`
#[derive(Debug, Default, Clone)]
pub struct ProviderUpdate {
    pub provider: Option<Provider>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Main orchestration engine: owns configuration and the provider adapter
pub struct Engine {
    config: Config,
    config_path: PathBuf,
    documenter: Arc<dyn LlmDocumenter>,
}

impl Engine {
    /// Create a new engine from the configuration file (or defaults)
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config_path = Config::resolve_path(config_path);
        let config = Config::load_or_default(&config_path)?;

        debug!("Loaded configuration from {}", config_path.display());

        let adapter = ProviderAdapter::new(
            Duration::from_secs(config.generation.request_timeout_secs),
            config.generation.min_response_chars,
        )?;

        Ok(Self::with_documenter(config, config_path, Arc::new(adapter)))
    }

    pub fn with_documenter(
        config: Config,
        config_path: PathBuf,
        documenter: Arc<dyn LlmDocumenter>,
    ) -> Self {
        Self {
            config,
            config_path,
            documenter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A fresh controller seeded from the saved settings
    pub fn controller(&self) -> Controller {
        let prompt_builder = PromptBuilder::new(self.config.generation.system_prompt_template.as_deref());
        let mut controller = Controller::new(
            Arc::clone(&self.documenter),
            self.config.provider.clone(),
            prompt_builder,
        );
        controller.set_tone(self.config.generation.default_tone);
        controller
    }

    /// Generate documentation for one input and export it
    pub async fn generate(
        &self,
        input: Option<PathBuf>,
        tone: Option<Tone>,
        output: Option<PathBuf>,
        print: bool,
        copy: bool,
    ) -> Result<()> {
        let source_code = read_source(input.as_deref()).await?;

        let mut controller = self.controller();
        if let Some(tone) = tone {
            controller.set_tone(tone);
        }
        controller.set_source_code(source_code);

        info!("📝 Generating documentation with {}...", self.config.provider.provider);
        let outcome = controller.generate(controller.current_request()).await;
        report(controller.drain_notifications());
        outcome?;

        if print {
            println!("{}", controller.document().unwrap_or_default());
        } else {
            let directory = output.unwrap_or_else(|| self.config.output.directory.clone());
            let saver = DirectorySaver::new(&directory);
            if let Some(path) = controller.export_file(&saver, &self.config.output.file_name) {
                info!("Wrote {}", path.display());
            }
        }

        if copy {
            controller.export_text(&TerminalClipboard);
        }

        report(controller.drain_notifications());
        Ok(())
    }

    /// Run the interactive session
    pub async fn session(&mut self, compact: bool) -> Result<()> {
        let mut controller = self.controller();
        controller.set_compact(compact);
        Session::new(self, controller).run().await?;
        Ok(())
    }

    /// Persist new provider settings; memory is only updated once the file is written
    pub fn save_provider_config(&mut self, provider: ProviderConfig) -> crate::error::Result<()> {
        let mut updated = self.config.clone();
        updated.provider = provider;
        updated.save(&self.config_path)?;

        info!("Saved {} settings to {}", updated.provider.provider, self.config_path.display());
        self.config = updated;
        Ok(())
    }

    /// Advance and persist the background, returning its name
    pub fn cycle_background(&mut self) -> crate::error::Result<&'static str> {
        let mut updated = self.config.clone();
        let name = updated.appearance.cycle_background();
        updated.save(&self.config_path)?;
        self.config = updated;
        Ok(name)
    }

    pub fn set_provider(&mut self, update: ProviderUpdate) -> Result<()> {
        let current = &self.config.provider;
        let mut provider = match update.provider {
            Some(p) if p != current.provider => ProviderConfig::new(p),
            _ => current.clone(),
        };

        if let Some(key) = update.api_key {
            provider = provider.with_api_key(key);
        }
        if let Some(model) = update.model {
            provider = provider.with_model(model);
        }
        if let Some(url) = update.base_url {
            provider = provider.with_base_url(url);
        }

        self.save_provider_config(provider)?;
        println!("Settings saved successfully");
        Ok(())
    }

    pub fn show_config(&self) {
        let provider = &self.config.provider;
        println!("Config file: {}", self.config_path.display());
        println!("Provider:    {} ({})", provider.provider, provider.provider.id());
        println!("Model:       {}", provider.model());
        println!("Endpoint:    {}", provider.base_url());
        println!("API key:     {}", mask_key(provider.api_key.as_deref()));
        println!("Tone:        {}", self.config.generation.default_tone);
        println!(
            "Output:      {}",
            self.config.output.directory.join(&self.config.output.file_name).display()
        );
        println!("Background:  {}", self.config.appearance.background_name());
    }

    /// Test the configured credentials against the provider
    pub async fn check_credentials(&self) -> Result<()> {
        let provider = &self.config.provider;
        match self.documenter.check_credentials(provider).await {
            Ok(CredentialCheck::Verified) => println!("Connection Verified!"),
            Ok(CredentialCheck::Skipped) => {
                println!("No connection test available for {}", provider.provider)
            }
            Err(e) => bail!("Connection Failed: {} (check your API key)", e.user_message()),
        }
        Ok(())
    }

    pub fn list_providers(&self) {
        for provider in Provider::ALL {
            println!("{}", provider_line(provider, provider == self.config.provider.provider));
        }
    }
}

/// Source code from a file, or stdin when the path is absent or "-"
async fn read_source(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut code = String::new();
            tokio::io::stdin().read_to_string(&mut code).await?;
            Ok(code)
        }
    }
}

fn report(notifications: Vec<Notification>) {
    for notification in notifications {
        match notification {
            Notification::Success(message) => eprintln!("✅ {}", message),
            Notification::Error(message) => eprintln!("❌ {}", message),
        }
    }
}

fn provider_line(provider: Provider, active: bool) -> String {
    let marker = if active { "*" } else { " " };
    let key = if provider.requires_api_key() { "key" } else { "free" };
    format!(
        "{} {:<13} {:<5} {:<36} {}",
        marker,
        provider.id(),
        key,
        provider.default_model(),
        provider.description()
    )
}

fn mask_key(key: Option<&str>) -> String {
    match key {
        None | Some("") => "(not set)".to_string(),
        Some(key) => {
            let visible: String = key.chars().take(4).collect();
            format!("{}…", visible)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::testing::FakeDocumenter;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine_at(dir: &Path) -> Engine {
        Engine::with_documenter(
            Config::default(),
            dir.join("documatic.toml"),
            Arc::new(FakeDocumenter::default()),
        )
    }

    #[test]
    fn test_set_provider_persists_and_resets_on_switch() {
        let dir = tempdir().unwrap();
        let mut engine = engine_at(dir.path());

        engine
            .set_provider(ProviderUpdate {
                provider: Some(Provider::OpenRouter),
                api_key: Some("sk-or".into()),
                model: Some("openai/gpt-4o".into()),
                ..Default::default()
            })
            .unwrap();

        engine
            .set_provider(ProviderUpdate {
                model: Some("anthropic/claude-3-haiku".into()),
                ..Default::default()
            })
            .unwrap();

        let saved = Config::load(dir.path().join("documatic.toml")).unwrap();
        assert_eq!(saved.provider.provider, Provider::OpenRouter);
        assert_eq!(saved.provider.api_key.as_deref(), Some("sk-or"));
        assert_eq!(saved.provider.model.as_deref(), Some("anthropic/claude-3-haiku"));

        engine
            .set_provider(ProviderUpdate {
                provider: Some(Provider::Pollinations),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(engine.config().provider, ProviderConfig::new(Provider::Pollinations));
    }

    #[test]
    fn test_failed_save_keeps_previous_settings() {
        let dir = tempdir().unwrap();
        let mut engine = Engine::with_documenter(
            Config::default(),
            dir.path().join("missing-dir").join("documatic.toml"),
            Arc::new(FakeDocumenter::default()),
        );

        let result = engine.save_provider_config(ProviderConfig::new(Provider::Gemini).with_api_key("g"));
        assert!(result.is_err());
        assert_eq!(engine.config().provider.provider, Provider::Pollinations);
    }

    #[test]
    fn test_controller_uses_saved_tone_and_provider() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.generation.default_tone = Tone::Detailed;
        config.provider = ProviderConfig::new(Provider::Together).with_api_key("t");

        let engine = Engine::with_documenter(
            config,
            dir.path().join("documatic.toml"),
            Arc::new(FakeDocumenter::default()),
        );
        let controller = engine.controller();
        assert_eq!(controller.tone(), Tone::Detailed);
        assert_eq!(controller.provider_config().provider, Provider::Together);
    }

    #[tokio::test]
    async fn test_generate_writes_readme_from_real_adapter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("```markdown\n# Hello\n\nGreets people.\n```"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let input = dir.path().join("hello.py");
        std::fs::write(&input, "print('hello')\n").unwrap();

        let mut config = Config::default();
        config.provider = ProviderConfig::new(Provider::Pollinations).with_base_url(server.uri());
        let adapter = ProviderAdapter::new(Duration::from_secs(5), 10).unwrap();
        let engine = Engine::with_documenter(config, dir.path().join("documatic.toml"), Arc::new(adapter));

        let out = dir.path().join("out");
        engine
            .generate(Some(input), Some(Tone::Concise), Some(out.clone()), false, false)
            .await
            .unwrap();

        let written = std::fs::read_to_string(out.join("README.md")).unwrap();
        assert_eq!(written, "# Hello\n\nGreets people.\n");
    }

    #[tokio::test]
    async fn test_generate_with_blank_file_fails_validation() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("empty.rs");
        std::fs::write(&input, "  \n").unwrap();

        let fake = Arc::new(FakeDocumenter::default());
        let engine = Engine::with_documenter(Config::default(), dir.path().join("c.toml"), fake.clone());

        let err = engine
            .generate(Some(input), None, Some(dir.path().to_path_buf()), false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Please enter some code first"));
        assert_eq!(fake.calls(), 0);
        assert!(!dir.path().join("README.md").exists());
    }

    #[test]
    fn test_provider_line_flags_key_requirement() {
        let line = provider_line(Provider::Pollinations, true);
        assert!(line.starts_with("* pollinations"));
        assert!(line.contains(" free "));

        let line = provider_line(Provider::Gemini, false);
        assert!(line.starts_with("  gemini"));
        assert!(line.contains(" key "));
        assert!(line.contains("gemini-pro"));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key(None), "(not set)");
        assert_eq!(mask_key(Some("hf_abcdef")), "hf_a…");
    }
}
