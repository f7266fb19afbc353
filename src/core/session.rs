// src/core/session.rs
use clap::ValueEnum;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info};

use crate::config::{Provider, ProviderConfig, Tone};
use crate::error::Result;
use super::controller::{Controller, DocumentView, Notification, Pane, Phase};
use super::engine::Engine;
use super::export::{DirectorySaver, TerminalClipboard};
use super::llm::Completion;

/// Completion of a background generation, tagged with its sequence number
type Finished = (u64, Result<Completion>);

const HELP: &str = "\
Commands:
  paste                 enter source code, end with a line containing only '.'
  load <path>           read source code from a file
  tone <tone>           professional | casual | detailed | concise
  generate              generate documentation from the current code
  show                  print the document (or the draft while editing)
  edit                  start editing the document
  draft                 replace the draft, end with a line containing only '.'
  save | cancel         finish editing
  copy                  copy the document to the clipboard
  download [dir]        write the document to disk
  provider <name> [key] [model]
  background            switch to the next background
  focus input|output    switch panes on a compact layout
  status | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Command,
    Paste,
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive terminal front end.
///
/// Reads commands from stdin while generations run on background tasks;
/// finished generations come back over a channel and are applied in
/// arrival order, the controller discarding superseded ones.
pub struct Session<'a> {
    engine: &'a mut Engine,
    controller: Controller,
    mode: InputMode,
    buffer: Vec<String>,
}

impl<'a> Session<'a> {
    pub fn new(engine: &'a mut Engine, controller: Controller) -> Self {
        Self {
            engine,
            controller,
            mode: InputMode::Command,
            buffer: Vec::new(),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Finished>();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("Documatic session ({}). Type 'help' for commands.", self.controller.provider_config().provider);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    let flow = self.handle_line(&line, &tx).await?;
                    self.flush_notifications();
                    if flow == Flow::Quit {
                        break;
                    }
                }
                Some((seq, outcome)) = rx.recv() => {
                    self.controller.finish_generation(seq, outcome);
                    self.flush_notifications();
                    if self.controller.phase() == Phase::Ready && self.controller.focus() == Pane::Output {
                        self.print_document();
                    }
                }
            }
        }

        info!("Session closed");
        Ok(())
    }

    pub async fn handle_line(&mut self, line: &str, tx: &UnboundedSender<Finished>) -> Result<Flow> {
        match self.mode {
            InputMode::Command => self.handle_command(line.trim(), tx).await,
            InputMode::Paste | InputMode::Draft => {
                if line.trim_end() == "." {
                    self.finish_block();
                } else {
                    self.buffer.push(line.to_string());
                }
                Ok(Flow::Continue)
            }
        }
    }

    fn finish_block(&mut self) {
        let mut text = std::mem::take(&mut self.buffer).join("\n");
        match self.mode {
            InputMode::Paste => {
                debug!("Captured {} bytes of source code", text.len());
                self.controller.set_source_code(text);
            }
            InputMode::Draft => {
                text.push('\n');
                self.controller.update_draft(text);
            }
            InputMode::Command => {}
        }
        self.mode = InputMode::Command;
    }

    async fn handle_command(&mut self, line: &str, tx: &UnboundedSender<Finished>) -> Result<Flow> {
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "help" => println!("{}", HELP),
            "quit" | "exit" => return Ok(Flow::Quit),
            "paste" => {
                self.mode = InputMode::Paste;
                println!("Paste your code, then a line with only '.'");
            }
            "load" => match tokio::fs::read_to_string(rest).await {
                Ok(code) => {
                    println!("Loaded {} ({} lines)", rest, code.lines().count());
                    self.controller.set_source_code(code);
                }
                Err(e) => self.controller.notify_error(format!("Could not read {}: {}", rest, e)),
            },
            "tone" => match Tone::from_str(rest, true) {
                Ok(tone) => self.controller.set_tone(tone),
                Err(_) => self.controller.notify_error(format!("Unknown tone: {}", rest)),
            },
            "generate" => self.spawn_generation(tx),
            "show" => self.print_document(),
            "edit" => {
                if self.controller.begin_edit() {
                    self.print_document();
                    println!("Editing. Use 'draft' to replace the text, then 'save' or 'cancel'.");
                } else {
                    self.controller.notify_error("Nothing to edit yet");
                }
            }
            "draft" => {
                if self.controller.view() == DocumentView::Editing {
                    self.mode = InputMode::Draft;
                    println!("Type the new text, then a line with only '.'");
                } else {
                    self.controller.notify_error("Not editing");
                }
            }
            "save" => {
                self.controller.save_edit();
            }
            "cancel" => {
                self.controller.cancel_edit();
            }
            "copy" => {
                self.controller.export_text(&TerminalClipboard);
            }
            "download" => {
                let output = &self.engine.config().output;
                let directory = if rest.is_empty() {
                    output.directory.clone()
                } else {
                    rest.into()
                };
                let file_name = output.file_name.clone();
                if let Some(path) = self.controller.export_file(&DirectorySaver::new(directory), &file_name) {
                    println!("Saved to {}", path.display());
                }
            }
            "provider" => self.switch_provider(rest),
            "background" => match self.engine.cycle_background() {
                Ok(name) => self.controller.notify_success(format!("Background Updated: {}", name)),
                Err(e) => self.controller.notify_error(e.user_message()),
            },
            "focus" => match rest {
                "input" => self.controller.set_focus(Pane::Input),
                "output" => self.controller.set_focus(Pane::Output),
                other => self.controller.notify_error(format!("Unknown pane: {}", other)),
            },
            "status" => self.print_status(),
            other => self.controller.notify_error(format!("Unknown command: {} (try 'help')", other)),
        }

        Ok(Flow::Continue)
    }

    fn spawn_generation(&mut self, tx: &UnboundedSender<Finished>) {
        let Ok(ticket) = self.controller.start_generation(self.controller.current_request()) else {
            return;
        };

        println!("Generating with {}...", ticket.config.provider);
        let documenter = self.controller.documenter();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = documenter.generate(&ticket.prompt, &ticket.config).await;
            let _ = tx.send((ticket.seq, outcome));
        });
    }

    /// Save the new provider settings, then hand them to the controller
    fn switch_provider(&mut self, args: &str) {
        let mut parts = args.split_whitespace();
        let Some(name) = parts.next() else {
            self.controller.notify_error("Usage: provider <name> [key] [model]");
            return;
        };
        let provider = match Provider::from_str(name, true) {
            Ok(provider) => provider,
            Err(_) => {
                self.controller.notify_error(format!("Unknown provider: {}", name));
                return;
            }
        };

        let mut config = ProviderConfig::new(provider);
        if let Some(key) = parts.next() {
            config = config.with_api_key(key);
        }
        if let Some(model) = parts.next() {
            config = config.with_model(model);
        }

        match self.engine.save_provider_config(config.clone()) {
            Ok(()) => {
                self.controller.update_provider_config(config);
                self.controller.notify_success("Settings saved successfully");
            }
            Err(e) => self.controller.notify_error(e.user_message()),
        }
    }

    fn print_document(&self) {
        match self.controller.view() {
            DocumentView::Empty => println!("Generated documentation will appear here"),
            DocumentView::Viewing => println!("{}", self.controller.document().unwrap_or_default()),
            DocumentView::Editing => {
                println!("-- Editing Mode --");
                println!("{}", self.controller.draft().unwrap_or_default());
            }
        }
    }

    fn print_status(&self) {
        let config = self.controller.provider_config();
        println!("Provider: {} ({})", config.provider, config.model());
        println!("Tone:     {}", self.controller.tone());
        println!("Input:    {} bytes", self.controller.source_code().len());
        println!("Preview:  {}", self.controller.preview_status());
        println!("Phase:    {:?}", self.controller.phase());
        println!("Focus:    {:?}", self.controller.focus());
        if let Some(result) = self.controller.last_result() {
            println!(
                "Last run:   {} ({} raw chars)",
                result.generated_at.format("%H:%M:%S"),
                result.raw_text.len()
            );
        }
        if let Some(err) = self.controller.last_error() {
            println!("Last error: {}", err);
        }
    }

    fn flush_notifications(&mut self) {
        for notification in self.controller.drain_notifications() {
            match notification {
                Notification::Success(message) => println!("✅ {}", message),
                Notification::Error(message) => println!("❌ {}", message),
            }
        }
    }

    #[cfg(test)]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::llm::testing::FakeDocumenter;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn feed(session: &mut Session<'_>, tx: &UnboundedSender<Finished>, lines: &[&str]) {
        for line in lines {
            session.handle_line(line, tx).await.unwrap();
        }
    }

    async fn settle(session: &mut Session<'_>, rx: &mut UnboundedReceiver<Finished>) {
        let (seq, outcome) = rx.recv().await.unwrap();
        session.controller.finish_generation(seq, outcome);
    }

    #[tokio::test]
    async fn test_paste_generate_edit_and_save() {
        let dir = tempdir().unwrap();
        let mut engine = Engine::with_documenter(
            Config::default(),
            dir.path().join("documatic.toml"),
            Arc::new(FakeDocumenter::default()),
        );
        let controller = engine.controller();
        let mut session = Session::new(&mut engine, controller);
        let (tx, mut rx) = mpsc::unbounded_channel();

        feed(&mut session, &tx, &["paste", "def add(a, b):", "    return a + b", ".", "tone casual", "generate"]).await;
        assert_eq!(session.controller().source_code(), "def add(a, b):\n    return a + b");
        assert_eq!(session.controller().tone(), Tone::Casual);
        assert!(session.controller().is_loading());

        settle(&mut session, &mut rx).await;
        assert_eq!(session.controller().phase(), Phase::Ready);
        assert!(session.controller().document().unwrap().contains("return a + b"));

        feed(&mut session, &tx, &["edit", "draft", "# Adder", "", "Adds numbers.", ".", "save"]).await;
        assert_eq!(session.controller().document(), Some("# Adder\n\nAdds numbers.\n"));
        assert_eq!(session.controller().view(), DocumentView::Viewing);
    }

    #[tokio::test]
    async fn test_generate_without_code_does_not_spawn() {
        let dir = tempdir().unwrap();
        let fake = Arc::new(FakeDocumenter::default());
        let mut engine = Engine::with_documenter(Config::default(), dir.path().join("d.toml"), fake.clone());
        let controller = engine.controller();
        let mut session = Session::new(&mut engine, controller);
        let (tx, mut rx) = mpsc::unbounded_channel();

        feed(&mut session, &tx, &["generate"]).await;
        drop(tx);

        assert!(rx.recv().await.is_none());
        assert_eq!(fake.calls(), 0);
        assert_eq!(session.controller().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_provider_command_persists_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("documatic.toml");
        let mut engine = Engine::with_documenter(
            Config::default(),
            path.clone(),
            Arc::new(FakeDocumenter::default()),
        );
        let controller = engine.controller();
        let mut session = Session::new(&mut engine, controller);
        let (tx, _rx) = mpsc::unbounded_channel();

        feed(&mut session, &tx, &["provider huggingface hf_secret bigcode/starcoder"]).await;

        let active = session.controller().provider_config().clone();
        assert_eq!(active.provider, Provider::HuggingFace);
        assert_eq!(active.model(), "bigcode/starcoder");

        let saved = Config::load(&path).unwrap();
        assert_eq!(saved.provider, active);
    }

    #[tokio::test]
    async fn test_unknown_provider_changes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("documatic.toml");
        let mut engine = Engine::with_documenter(
            Config::default(),
            path.clone(),
            Arc::new(FakeDocumenter::default()),
        );
        let controller = engine.controller();
        let mut session = Session::new(&mut engine, controller);
        let (tx, _rx) = mpsc::unbounded_channel();

        feed(&mut session, &tx, &["provider anthropic key"]).await;

        assert_eq!(session.controller().provider_config().provider, Provider::Pollinations);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_quit() {
        let dir = tempdir().unwrap();
        let mut engine = Engine::with_documenter(
            Config::default(),
            dir.path().join("d.toml"),
            Arc::new(FakeDocumenter::default()),
        );
        let controller = engine.controller();
        let mut session = Session::new(&mut engine, controller);
        let (tx, _rx) = mpsc::unbounded_channel();

        assert_eq!(session.handle_line("quit", &tx).await.unwrap(), Flow::Quit);
    }
}
