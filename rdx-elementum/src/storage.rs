//! Durable blob storage for the progress record.
//!
//! The persistence service only needs to read and replace one text blob, so
//! storage sits behind the small `ProgressStore` trait. `FileStore` keeps it
//! in a single file and replaces it atomically; `MemoryStore` keeps it in a
//! shared in-process slot.

use crate::config::DEFAULT_FILE_NAME;
use crate::error::PersistenceError;
use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::NamedTempFile;

/// A single durable text slot.
pub trait ProgressStore {
    /// Returns the stored text, or `None` if nothing has been written yet.
    fn read(&self) -> Result<Option<String>, PersistenceError>;

    /// Replaces the stored text.
    fn write(&self, contents: &str) -> Result<(), PersistenceError>;

    /// Where the blob lives, for log messages.
    fn location(&self) -> String;
}

/// Stores progress in one file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// A store for `file_name` inside `data_dir`. A blank name falls back to
    /// `player_progress.json`.
    pub fn new(data_dir: impl AsRef<Path>, file_name: &str) -> Self {
        let file_name = if file_name.trim().is_empty() {
            DEFAULT_FILE_NAME
        } else {
            file_name
        };
        Self {
            path: data_dir.as_ref().join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl ProgressStore for FileStore {
    fn read(&self) -> Result<Option<String>, PersistenceError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(String::from_utf8(bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a temp file beside the record, then renames it over the
    /// record. A crash mid-write leaves the previous record intact.
    fn write(&self, contents: &str) -> Result<(), PersistenceError> {
        let dir = self.directory();
        fs::create_dir_all(dir)?;

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(contents.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Stores progress in memory. Clones share the same slot.
///
/// Suits hosts that keep progress in a key-value blob they flush themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<String>>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `contents`, as if written by a prior run.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        let store = Self::default();
        *store.slot.borrow_mut() = Some(contents.into());
        store
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.borrow().clone()
    }

    /// Successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl ProgressStore for MemoryStore {
    fn read(&self) -> Result<Option<String>, PersistenceError> {
        Ok(self.contents())
    }

    fn write(&self, contents: &str) -> Result<(), PersistenceError> {
        *self.slot.borrow_mut() = Some(contents.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
