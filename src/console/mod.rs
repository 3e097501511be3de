//! # Script Console
//!
//! Operator-side editor for control scripts: a title and a body that can be
//! saved to and loaded from a [`ScriptStore`], and turned into `run-script`
//! commands for the remote. What a script means is up to the remote.
//!
//! Validation failures (empty title, empty script, unknown title, unsaved
//! edits) are reported to the operator through the notifier and abort the
//! operation. Nothing is retried.

pub mod commands;
pub mod store;

pub use commands::ConsoleInput;
pub use store::{JsonFileScriptStore, MemoryScriptStore, ScriptStore};

use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{PadBridgeError, Result};
use crate::notify::{SharedNotifier, STATUS_UNKNOWN};
use crate::protocol::{Command, Severity};

/// Script editor state bound to a store.
pub struct ScriptConsole<S: ScriptStore> {
    store: S,
    title: String,
    contents: String,
    notifier: SharedNotifier,
}

impl<S: ScriptStore> ScriptConsole<S> {
    /// Empty editor over `store`.
    pub fn new(store: S, notifier: SharedNotifier) -> Self {
        Self {
            store,
            title: String::new(),
            contents: String::new(),
            notifier,
        }
    }

    /// Editor title with surrounding whitespace removed.
    pub fn title(&self) -> &str {
        self.title.trim()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn set_contents(&mut self, contents: impl Into<String>) {
        self.contents = contents.into();
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Where operator-facing messages go.
    pub fn notifier(&self) -> &SharedNotifier {
        &self.notifier
    }

    /// Whether discarding the editor would lose nothing.
    ///
    /// A blank editor counts as saved. Otherwise the title must be set and
    /// the store must hold exactly the current text under it.
    pub fn is_saved(&self) -> bool {
        if self.contents.trim().is_empty() {
            return true;
        }
        let title = self.title();
        if title.is_empty() {
            return false;
        }
        self.store.load(title).as_deref() == Some(self.contents.as_str())
    }

    /// Save the editor under its title.
    ///
    /// Returns `Ok(false)` when there was nothing new to save.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty script or an empty title
    /// - `Io` / `Json` if the store cannot be written
    pub fn save(&mut self) -> Result<bool> {
        if self.contents.trim().is_empty() {
            return Err(self.reject("Empty script!"));
        }
        if self.title().is_empty() {
            return Err(self.reject("Empty title!"));
        }
        if self.is_saved() {
            return Ok(false);
        }

        let title = self.title().to_string();
        if let Err(e) = self.store.save(&title, &self.contents) {
            self.notifier
                .message(Severity::Error, &format!("Failed to save '{}': {}", title, e));
            return Err(e);
        }
        info!("Saved script '{}'", title);
        Ok(true)
    }

    /// Replace the editor with a stored script.
    ///
    /// Unsaved edits block the load unless `force` is set.
    pub fn load(&mut self, title: &str, force: bool) -> Result<()> {
        let Some(script) = self.store.load(title) else {
            let error = PadBridgeError::ScriptNotFound(title.to_string());
            self.notifier.message(Severity::Error, &error.to_string());
            return Err(error);
        };
        if !force && !self.is_saved() {
            return Err(self.reject("Current script is not saved! Use 'load! <title>' to discard it."));
        }

        self.title = title.to_string();
        self.contents = script;
        Ok(())
    }

    /// Load editor contents from a file on disk, keeping the title.
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                self.contents = text;
                Ok(())
            }
            Err(e) => {
                self.notifier.message(
                    Severity::Error,
                    &format!("Cannot read {}: {}", path.display(), e),
                );
                Err(e.into())
            }
        }
    }

    /// Stored titles, sorted.
    pub fn titles(&self) -> Vec<String> {
        self.store.titles()
    }

    /// Write every stored script to `path` as one JSON object.
    ///
    /// Returns how many scripts were written.
    pub fn backup<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let scripts = self.store.all();
        fs::write(path.as_ref(), serde_json::to_string_pretty(&scripts)?)?;
        info!("Backed up {} scripts to {}", scripts.len(), path.as_ref().display());
        Ok(scripts.len())
    }

    /// `run-script` with the current editor text.
    pub fn run_command(&self) -> Command {
        Command::RunScript {
            text: self.contents.clone(),
        }
    }

    /// Apply one operator input.
    ///
    /// Returns the command to send to the remote, if the input produces one.
    /// Local failures are already reported to the operator and are not
    /// returned as errors.
    pub fn execute(&mut self, input: ConsoleInput) -> Option<Command> {
        let outcome = match input {
            ConsoleInput::Title(title) => {
                self.set_title(title);
                Ok(None)
            }
            ConsoleInput::Open(path) => self.open_file(&path).map(|_| None),
            ConsoleInput::Save => self.save().map(|saved| {
                if saved {
                    self.notifier
                        .message(Severity::Info, &format!("Saved '{}'", self.title()));
                }
                None
            }),
            ConsoleInput::Load { title, force } => self.load(&title, force).map(|_| None),
            ConsoleInput::List => {
                let titles = self.titles();
                let listing = if titles.is_empty() {
                    "No saved scripts".to_string()
                } else {
                    titles.join("\n")
                };
                self.notifier.message(Severity::Info, &listing);
                Ok(None)
            }
            ConsoleInput::Show => {
                let text = format!("[{}]\n{}", self.title(), self.contents);
                self.notifier.message(Severity::Info, &text);
                Ok(None)
            }
            ConsoleInput::Backup(path) => self.backup(&path).map(|count| {
                self.notifier.message(
                    Severity::Info,
                    &format!("Wrote {} scripts to {}", count, path.display()),
                );
                None
            }),
            ConsoleInput::Run => Ok(Some(self.run_command())),
            ConsoleInput::Abort => Ok(Some(Command::AbortScript)),
            ConsoleInput::Restart => Ok(Some(Command::Restart)),
            ConsoleInput::Status => {
                // shown until the reply arrives
                self.notifier.connection_status(STATUS_UNKNOWN);
                Ok(Some(Command::Status))
            }
            ConsoleInput::Help => {
                self.notifier.message(Severity::Info, commands::HELP);
                Ok(None)
            }
            ConsoleInput::Quit => Ok(None),
        };
        // failures have already been shown to the operator
        outcome.unwrap_or(None)
    }

    fn reject(&self, message: &str) -> PadBridgeError {
        self.notifier.message(Severity::Error, message);
        PadBridgeError::Validation(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::mocks::RecordingNotifier;
    use std::sync::Arc;

    fn console() -> (ScriptConsole<MemoryScriptStore>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (ScriptConsole::new(MemoryScriptStore::new(), notifier.clone()), notifier)
    }

    #[test]
    fn test_blank_editor_is_saved() {
        let (mut console, _) = console();
        assert!(console.is_saved());
        console.set_contents("   \n");
        assert!(console.is_saved());
    }

    #[test]
    fn test_untitled_text_is_unsaved() {
        let (mut console, _) = console();
        console.set_contents("press A");
        assert!(!console.is_saved());
    }

    #[test]
    fn test_save_empty_title_rejected() {
        let (mut console, notifier) = console();
        console.set_contents("press A");
        console.set_title("   ");

        let result = console.save();

        assert!(matches!(result, Err(PadBridgeError::Validation(_))));
        assert_eq!(notifier.messages(), vec![(Severity::Error, "Empty title!".to_string())]);
        assert!(console.titles().is_empty());
    }

    #[test]
    fn test_save_empty_script_rejected() {
        let (mut console, notifier) = console();
        console.set_title("mash");

        assert!(matches!(console.save(), Err(PadBridgeError::Validation(_))));
        assert_eq!(notifier.messages()[0].1, "Empty script!");
    }

    #[test]
    fn test_save_then_saved() {
        let (mut console, _) = console();
        console.set_title("  mash ");
        console.set_contents("press A");

        assert!(console.save().unwrap());
        assert!(console.is_saved());
        assert!(!console.save().unwrap());
        assert_eq!(console.titles(), vec!["mash".to_string()]);

        console.set_contents("press B");
        assert!(!console.is_saved());
    }

    #[test]
    fn test_load_unknown_title() {
        let (mut console, notifier) = console();

        let result = console.load("ghost", false);

        assert!(matches!(result, Err(PadBridgeError::ScriptNotFound(_))));
        assert_eq!(notifier.messages()[0].1, "No script named 'ghost'");
    }

    #[test]
    fn test_load_refuses_to_discard_unsaved_edits() {
        let (mut console, _) = console();
        console.set_title("a");
        console.set_contents("press A");
        console.save().unwrap();
        console.set_title("b");
        console.set_contents("press B");

        assert!(console.load("a", false).is_err());
        assert_eq!(console.contents(), "press B");

        console.load("a", true).unwrap();
        assert_eq!(console.title(), "a");
        assert_eq!(console.contents(), "press A");
    }

    #[test]
    fn test_execute_maps_remote_commands() {
        let (mut console, _) = console();
        console.set_contents("wait 100");

        assert_eq!(
            console.execute(ConsoleInput::Run),
            Some(Command::RunScript { text: "wait 100".into() })
        );
        assert_eq!(console.execute(ConsoleInput::Abort), Some(Command::AbortScript));
        assert_eq!(console.execute(ConsoleInput::Restart), Some(Command::Restart));
        assert_eq!(console.execute(ConsoleInput::Status), Some(Command::Status));
        assert_eq!(console.execute(ConsoleInput::Title("x".into())), None);
    }

    #[test]
    fn test_status_resets_display_before_query() {
        let (mut console, notifier) = console();

        assert_eq!(console.execute(ConsoleInput::Status), Some(Command::Status));

        assert_eq!(notifier.statuses(), vec![STATUS_UNKNOWN.to_string()]);
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn test_execute_swallows_local_failures() {
        let (mut console, notifier) = console();
        assert_eq!(console.execute(ConsoleInput::Save), None);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[test]
    fn test_backup_writes_all_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let (mut console, _) = console();
        for (title, text) in [("one", "press A"), ("two", "press B")] {
            console.set_title(title);
            console.set_contents(text);
            console.save().unwrap();
        }

        assert_eq!(console.backup(&path).unwrap(), 2);

        let written: std::collections::BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["two"], "press B");
    }

    #[test]
    fn test_open_file_keeps_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combo.txt");
        fs::write(&path, "press X\nwait 50\n").unwrap();
        let (mut console, _) = console();
        console.set_title("combo");

        console.open_file(&path).unwrap();

        assert_eq!(console.title(), "combo");
        assert_eq!(console.contents(), "press X\nwait 50\n");
        assert!(console.open_file(dir.path().join("missing.txt")).is_err());
    }
}
