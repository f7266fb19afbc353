//! Provider adapter layer
//!
//! Maps the normalized prompt pair onto each backend's wire format and pulls
//! plain text back out of its response shape.

mod documenter;
mod providers;

pub use documenter::{Completion, CredentialCheck, LlmDocumenter, Prompt};
pub use providers::ProviderAdapter;

#[cfg(test)]
pub(crate) mod testing;
