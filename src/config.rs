use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{DocumaticError, Result};

/// Config file names probed in the working directory, in order
const CONFIG_CANDIDATES: [&str; 3] = ["Documatic.toml", "documatic.toml", ".documatic.toml"];

/// Background gradients the surface can cycle through
pub const BACKGROUNDS: [&str; 5] = [
    "aurora",
    "ocean depths",
    "sunset vibes",
    "midnight bloom",
    "nebula dream",
];

/// The text-generation backends Documatic can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Pollinations,
    #[value(name = "huggingface")]
    HuggingFace,
    #[value(name = "openrouter")]
    OpenRouter,
    Together,
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Pollinations,
        Provider::HuggingFace,
        Provider::OpenRouter,
        Provider::Together,
        Provider::Gemini,
    ];

    /// Identifier used in config files and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Pollinations => "pollinations",
            Provider::HuggingFace => "huggingface",
            Provider::OpenRouter => "openrouter",
            Provider::Together => "together",
            Provider::Gemini => "gemini",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Pollinations)
    }

    /// Model used when the configuration does not override it
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Pollinations => "openai",
            Provider::HuggingFace => "mistralai/Mistral-7B-Instruct-v0.2",
            Provider::OpenRouter => "mistralai/mistral-7b-instruct",
            Provider::Together => "meta-llama/Llama-3-8b-chat-hf",
            Provider::Gemini => "gemini-pro",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Pollinations => "https://text.pollinations.ai",
            Provider::HuggingFace => "https://api-inference.huggingface.co",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Together => "https://api.together.xyz/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Provider::Pollinations => "Free, no key required. Limited by strict content filters.",
            Provider::HuggingFace => "Requires User Access Token (Read). Great for free inference.",
            Provider::OpenRouter => "Aggregator for GPT-4, Claude 3, Llama 3. Paid per usage.",
            Provider::Together => "Fast inference for open source models (Llama-3, Mixtral).",
            Provider::Gemini => "Google's Gemini Pro. Free tier available.",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Pollinations => "Pollinations",
            Provider::HuggingFace => "HuggingFace",
            Provider::OpenRouter => "OpenRouter",
            Provider::Together => "Together",
            Provider::Gemini => "Gemini",
        };
        f.write_str(name)
    }
}

/// Writing style requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Detailed,
    Concise,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tone::Professional => "Professional",
            Tone::Casual => "Casual",
            Tone::Detailed => "Detailed",
            Tone::Concise => "Concise",
        };
        f.write_str(name)
    }
}

/// Which backend to call and how to authenticate against it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: Provider,

    /// API key (required for every provider except Pollinations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model override; the provider default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Endpoint root override for gateways and local mocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            api_key: None,
            model: None,
            base_url: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Configured model, ignoring blank overrides
    pub fn model(&self) -> &str {
        match self.model.as_deref().map(str::trim) {
            Some(model) if !model.is_empty() => model,
            _ => self.provider.default_model(),
        }
    }

    pub fn base_url(&self) -> &str {
        match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.trim_end_matches('/'),
            _ => self.provider.default_base_url(),
        }
    }

    /// The API key, or an error when the provider needs one and none is set
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(DocumaticError::MissingApiKey {
                provider: self.provider,
            }),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(Provider::Pollinations)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Tone used when none is given on the command line
    pub default_tone: Tone,

    /// Responses shorter than this (after trimming) are treated as empty
    pub min_response_chars: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Custom tera template for the system prompt; `{{ tone }}` is available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name used when downloading the document
    pub file_name: String,

    /// Directory the document is written to
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppearanceConfig {
    /// Index into [`BACKGROUNDS`]
    pub background: usize,
}

impl AppearanceConfig {
    pub fn background_name(&self) -> &'static str {
        BACKGROUNDS[self.background % BACKGROUNDS.len()]
    }

    /// Advance to the next background, wrapping around
    pub fn cycle_background(&mut self) -> &'static str {
        self.background = (self.background + 1) % BACKGROUNDS.len();
        self.background_name()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active provider settings
    pub provider: ProviderConfig,

    /// Generation settings
    pub generation: GenerationConfig,

    /// Export settings
    pub output: OutputConfig,

    /// Surface appearance
    #[serde(default)]
    pub appearance: AppearanceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            generation: GenerationConfig {
                default_tone: Tone::Professional,
                min_response_chars: 10,
                request_timeout_secs: 120,
                system_prompt_template: None,
            },
            output: OutputConfig {
                file_name: "README.md".to_string(),
                directory: PathBuf::from("."),
            },
            appearance: AppearanceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| DocumaticError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every generation fail
    pub fn validate(&self) -> Result<()> {
        if self.generation.request_timeout_secs == 0 {
            return Err(DocumaticError::Config(
                "generation.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DocumaticError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Where the configuration lives: the explicit path, an existing candidate, or the default name
    pub fn resolve_path(path: Option<&Path>) -> PathBuf {
        if let Some(p) = path {
            return p.to_path_buf();
        }

        CONFIG_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| PathBuf::from(CONFIG_CANDIDATES[2]))
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_zero_timeout_is_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("documatic.toml");
        let mut config = Config::default();
        config.generation.request_timeout_secs = 0;
        config.save(&path).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, DocumaticError::Config(_)));
        assert!(err.to_string().contains("request_timeout_secs"));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("nope.toml")).unwrap();

        assert_eq!(config.provider.provider, Provider::Pollinations);
        assert_eq!(config.generation.min_response_chars, 10);
        assert_eq!(config.output.file_name, "README.md");
    }

    #[test]
    fn test_save_and_load_preserves_provider_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("documatic.toml");

        let mut config = Config::default();
        config.provider = ProviderConfig::new(Provider::Together)
            .with_api_key("tk-123")
            .with_model("mistralai/Mixtral-8x7B-Instruct-v0.1");
        config.appearance.background = 3;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.provider, config.provider);
        assert_eq!(loaded.appearance.background_name(), "midnight bloom");
    }

    #[test]
    fn test_provider_ids_round_trip_through_toml() {
        let toml_text = r#"
[provider]
provider = "huggingface"
api_key = "hf_abc"

[generation]
default_tone = "Casual"
min_response_chars = 10
request_timeout_secs = 30

[output]
file_name = "README.md"
directory = "docs"
"#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert_eq!(config.provider.provider, Provider::HuggingFace);
        assert_eq!(config.generation.default_tone, Tone::Casual);
        assert_eq!(config.appearance.background, 0);
    }

    #[test]
    fn test_blank_model_falls_back_to_default() {
        let config = ProviderConfig::new(Provider::OpenRouter).with_model("   ");
        assert_eq!(config.model(), "mistralai/mistral-7b-instruct");

        let config = ProviderConfig::new(Provider::Gemini).with_model("gemini-1.5-flash");
        assert_eq!(config.model(), "gemini-1.5-flash");
    }

    #[test]
    fn test_base_url_override_drops_trailing_slash() {
        let config = ProviderConfig::new(Provider::Together).with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
        assert_eq!(
            ProviderConfig::new(Provider::Together).base_url(),
            "https://api.together.xyz/v1"
        );
    }

    #[test]
    fn test_require_api_key() {
        let config = ProviderConfig::new(Provider::Gemini);
        assert!(matches!(
            config.require_api_key(),
            Err(DocumaticError::MissingApiKey { provider: Provider::Gemini })
        ));
        assert_eq!(config.with_api_key("k").require_api_key().unwrap(), "k");
    }

    #[test]
    fn test_background_cycles_through_all_entries() {
        let mut appearance = AppearanceConfig::default();
        for _ in 0..BACKGROUNDS.len() - 1 {
            appearance.cycle_background();
        }
        assert_eq!(appearance.background_name(), "nebula dream");
        assert_eq!(appearance.cycle_background(), "aurora");
    }
}
