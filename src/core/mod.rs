mod cleanup;
mod controller;
mod engine;
mod export;
mod llm;
mod prompt;
mod session;

// Export the main engine
pub use engine::{Engine, ProviderUpdate};
