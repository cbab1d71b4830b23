//! Content persistence.
//!
//! The core never persists anything on its own; hosts plug a
//! [`ContentStore`] into the session to load the seed and save edits.

use std::cell::RefCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where document content lives between sessions.
pub trait ContentStore {
    /// Stored content, or `None` if nothing has been saved yet.
    ///
    /// # Errors
    /// Returns an error if stored content exists but cannot be read.
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored content.
    ///
    /// # Errors
    /// Returns an error if the content cannot be written.
    fn save(&self, content: &str) -> Result<(), StoreError>;
}

/// Stores content in a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ContentStore for FileStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Writes a sibling temporary file first and renames it over the
    /// target, so readers never observe a half-written document.
    fn save(&self, content: &str) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, content).map_err(write_err)?;
        fs::rename(&temp, &self.path).map_err(write_err)?;
        tracing::debug!(path = %self.path.display(), bytes = content.len(), "content saved");
        Ok(())
    }
}

/// In-memory store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    content: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: RefCell::new(Some(content.into())),
        }
    }
}

impl ContentStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.content.borrow().clone())
    }

    fn save(&self, content: &str) -> Result<(), StoreError> {
        *self.content.borrow_mut() = Some(content.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_missing_file_loads_none() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("doc.html"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_save_then_load() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("doc.html"));
        store.save("<p>saved</p>").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("<p>saved</p>"));
        assert!(!dir.path().join("nested").join("doc.html.tmp").exists());
    }

    #[test]
    fn test_file_store_save_replaces_content() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("doc.html"));
        store.save("first, and longer").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_file_store_reading_a_directory_fails() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(store.load(), Err(StoreError::Read { .. })));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save("x").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("x"));
        assert_eq!(
            MemoryStore::with_content("seed").load().unwrap().as_deref(),
            Some("seed")
        );
    }
}
