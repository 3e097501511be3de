//! Saved-script storage keyed by title

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;

/// Title → script text storage.
pub trait ScriptStore {
    /// Script saved under exactly `title`.
    fn load(&self, title: &str) -> Option<String>;

    /// Store or overwrite.
    fn save(&mut self, title: &str, contents: &str) -> Result<()>;

    /// Every title, sorted.
    fn titles(&self) -> Vec<String>;

    /// Every script, for backups.
    fn all(&self) -> BTreeMap<String, String>;
}

/// Store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryScriptStore {
    scripts: BTreeMap<String, String>,
}

impl MemoryScriptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScriptStore for MemoryScriptStore {
    fn load(&self, title: &str) -> Option<String> {
        self.scripts.get(title).cloned()
    }

    fn save(&mut self, title: &str, contents: &str) -> Result<()> {
        self.scripts.insert(title.to_string(), contents.to_string());
        Ok(())
    }

    fn titles(&self) -> Vec<String> {
        self.scripts.keys().cloned().collect()
    }

    fn all(&self) -> BTreeMap<String, String> {
        self.scripts.clone()
    }
}

/// Store kept as a single JSON object on disk, rewritten on every save.
#[derive(Debug, Clone)]
pub struct JsonFileScriptStore {
    path: PathBuf,
    scripts: BTreeMap<String, String>,
}

impl JsonFileScriptStore {
    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file exists but cannot be read, `Json` if it is
    /// not an object of strings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let scripts = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            debug!("No script store at {}, starting empty", path.display());
            BTreeMap::new()
        };
        info!("Loaded {} saved scripts from {}", scripts.len(), path.display());
        Ok(Self { path, scripts })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScriptStore for JsonFileScriptStore {
    fn load(&self, title: &str) -> Option<String> {
        self.scripts.get(title).cloned()
    }

    fn save(&mut self, title: &str, contents: &str) -> Result<()> {
        self.scripts.insert(title.to_string(), contents.to_string());
        fs::write(&self.path, serde_json::to_string(&self.scripts)?)?;
        debug!("Saved script '{}' to {}", title, self.path.display());
        Ok(())
    }

    fn titles(&self) -> Vec<String> {
        self.scripts.keys().cloned().collect()
    }

    fn all(&self) -> BTreeMap<String, String> {
        self.scripts.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_titles_sorted() {
        let mut store = MemoryScriptStore::new();
        store.save("zigzag", "press A").unwrap();
        store.save("alpha", "press B").unwrap();

        assert_eq!(store.titles(), vec!["alpha".to_string(), "zigzag".to_string()]);
        assert_eq!(store.load("alpha").as_deref(), Some("press B"));
        assert!(store.load("Alpha").is_none());
    }

    #[test]
    fn test_json_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scripts.json");

        let mut store = JsonFileScriptStore::open(&path).unwrap();
        assert!(store.titles().is_empty());
        store.save("mash", "press A\nwait 100").unwrap();

        let reopened = JsonFileScriptStore::open(&path).unwrap();
        assert_eq!(reopened.load("mash").as_deref(), Some("press A\nwait 100"));
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scripts.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(JsonFileScriptStore::open(&path).is_err());
    }
}
