//! services/client/src/adapters/storage.rs
//!
//! File-backed implementation of the `DurableStorage` port. All entries live in
//! one JSON object; every change rewrites the file through a temporary file and
//! a rename, so a crash mid-write never leaves a half-written token pair.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use todo_core::ports::{DurableStorage, PortError, PortResult};
use tracing::warn;

type Entries = BTreeMap<String, String>;

pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> PortResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            PortError::Storage(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        Ok(Some(contents).filter(|c| !c.trim().is_empty()))
    }

    fn parse(&self, contents: &str) -> PortResult<Entries> {
        serde_json::from_str(contents).map_err(|e| {
            PortError::Storage(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }

    fn load(&self) -> PortResult<Entries> {
        match self.read()? {
            Some(contents) => self.parse(&contents),
            None => Ok(Entries::new()),
        }
    }

    fn save(&self, entries: &Entries) -> PortResult<()> {
        let storage_err =
            |e: std::io::Error| PortError::Storage(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Storage(format!("Failed to encode token store: {e}")))?;

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file = open_private(&tmp_path).map_err(storage_err)?;
            file.write_all(contents.as_bytes()).map_err(storage_err)?;
            file.sync_all().map_err(storage_err)?;
        }
        fs::rename(&tmp_path, &self.path).map_err(storage_err)
    }

    /// Read-modify-write. An unparsable file is replaced rather than left to
    /// block every later write.
    fn modify(&self, change: impl FnOnce(&mut Entries)) -> PortResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PortError::Storage("token store lock poisoned".to_string()))?;
        let mut entries = match self.read()? {
            Some(contents) => self.parse(&contents).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable token store");
                Entries::new()
            }),
            None => Entries::new(),
        };
        change(&mut entries);
        self.save(&entries)
    }
}

/// Opens a file for writing, readable only by the current user on unix.
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn apply(&self, entries: &[(&str, &str)], removed: &[&str]) -> PortResult<()> {
        if entries.is_empty() && !self.path.exists() {
            return Ok(());
        }
        self.modify(|stored| {
            for (key, value) in entries {
                stored.insert((*key).to_string(), (*value).to_string());
            }
            for key in removed {
                stored.remove(*key);
            }
        })
    }
}
