use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::config::{Provider, Tone};
use crate::core::{Engine, ProviderUpdate};

#[derive(Parser)]
#[command(name = "documatic")]
#[command(about = "Turn source code into an editable README with any text-generation API")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a README for a source file
    Generate {
        /// Source file to document ("-" or omitted reads stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Writing tone (defaults to the configured tone)
        #[arg(short, long, value_enum)]
        tone: Option<Tone>,

        /// Directory to write the README into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the README instead of writing it
        #[arg(long, conflicts_with = "output")]
        print: bool,

        /// Also copy the README to the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Interactive session: paste, generate, edit, export
    Session {
        /// Single-pane layout; jumps to the output after each generation
        #[arg(long)]
        compact: bool,
    },

    /// Inspect or change provider settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List supported providers
    Providers,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the active settings
    Show,

    /// Save provider settings
    Set {
        /// Provider to use (switching resets key, model and endpoint)
        #[arg(long, value_enum)]
        provider: Option<Provider>,

        /// API key for the provider
        #[arg(long)]
        api_key: Option<String>,

        /// Model override
        #[arg(long)]
        model: Option<String>,

        /// Endpoint root override
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Test the saved credentials against the provider
    Check,
}

impl Cli {
    pub async fn execute(self, mut engine: Engine) -> Result<()> {
        match self.command {
            Commands::Generate { input, tone, output, print, copy } => {
                engine.generate(input, tone, output, print, copy).await
            }
            Commands::Session { compact } => {
                engine.session(compact).await
            }
            Commands::Config { action } => match action {
                ConfigAction::Show => {
                    engine.show_config();
                    Ok(())
                }
                ConfigAction::Set { provider, api_key, model, base_url } => {
                    engine.set_provider(ProviderUpdate { provider, api_key, model, base_url })
                }
                ConfigAction::Check => {
                    engine.check_credentials().await
                }
            },
            Commands::Providers => {
                engine.list_providers();
                Ok(())
            }
        }
    }
}
