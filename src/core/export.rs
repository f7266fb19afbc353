use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::error::{DocumaticError, Result};

pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown";

/// Destination for "copy to clipboard"
pub trait Clipboard {
    fn copy_text(&self, text: &str) -> Result<()>;
}

/// Destination for "download as file"
pub trait FileSaver {
    /// Store `contents` under `file_name`, returning where it landed
    fn save_file(&self, file_name: &str, content_type: &str, contents: &str) -> Result<PathBuf>;
}

/// Copies through the terminal using the OSC 52 escape sequence.
///
/// Works over SSH and inside tmux when clipboard passthrough is enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalClipboard;

impl Clipboard for TerminalClipboard {
    fn copy_text(&self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(osc52_sequence(text).as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| DocumaticError::Export(format!("clipboard write failed: {}", e)))
    }
}

pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// Writes exported documents into a directory
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    directory: PathBuf,
}

impl DirectorySaver {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }
}

impl FileSaver for DirectorySaver {
    fn save_file(&self, file_name: &str, content_type: &str, contents: &str) -> Result<PathBuf> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(DocumaticError::Export(format!("invalid file name: {:?}", file_name)));
        }

        std::fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(file_name);
        std::fs::write(&path, contents)?;

        debug!("Wrote {} ({}, {} bytes)", path.display(), content_type, contents.len());
        Ok(path)
    }
}
