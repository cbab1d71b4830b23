use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use crate::editor::{EditorConfiguration, ExternalEditor};
use crate::store::{ContentStore, FileStore};
use crate::watcher::FileWatcher;

/// An editor that lives outside the process: whatever program writes the
/// document file is the editor, and each settled write is one change event.
#[derive(Debug)]
pub struct FileEditor {
    store: FileStore,
    watcher: Option<FileWatcher>,
    last_seen: String,
    configuration: Option<Rc<EditorConfiguration>>,
}

impl FileEditor {
    /// Editor for `path` that never reports changes.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: FileStore::new(path),
            watcher: None,
            last_seen: String::new(),
            configuration: None,
        }
    }

    /// Editor for `path` that reports writes once they settle for `debounce`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be watched.
    pub fn watching(path: impl Into<PathBuf>, debounce: Duration) -> notify::Result<Self> {
        let path = path.into();
        let watcher = FileWatcher::new(&path, debounce)?;
        let mut editor = Self::new(path);
        editor.watcher = Some(watcher);
        Ok(editor)
    }

    /// Record the value the session mounted with, so an unchanged file is
    /// not reported as an edit.
    #[must_use]
    pub fn seeded(mut self, initial: &str, configuration: Rc<EditorConfiguration>) -> Self {
        initial.clone_into(&mut self.last_seen);
        self.configuration = Some(configuration);
        self
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn configuration(&self) -> Option<&Rc<EditorConfiguration>> {
        self.configuration.as_ref()
    }
}

impl ExternalEditor for FileEditor {
    fn reconfigure(&mut self, configuration: Rc<EditorConfiguration>) {
        tracing::debug!(
            inline_images = configuration.uploader.insert_image_as_base64_uri,
            "file editor reconfigured"
        );
        self.configuration = Some(configuration);
    }

    fn focus(&mut self) {
        tracing::debug!(path = %self.path().display(), "focus requested for file editor");
    }

    fn poll_change(&mut self) -> Option<String> {
        if !self.watcher.as_mut()?.poll_settled() {
            return None;
        }
        match self.store.load() {
            Ok(Some(content)) if content != self.last_seen => {
                self.last_seen.clone_from(&content);
                Some(content)
            }
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to reload document");
                None
            }
        }
    }

    fn teardown(&mut self) {
        self.watcher = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::tempdir;

    #[test]
    fn test_unwatched_editor_reports_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.html");
        std::fs::write(&path, "<p>x</p>").unwrap();
        let mut editor = FileEditor::new(&path);
        assert_eq!(editor.poll_change(), None);
    }

    #[test]
    fn test_reconfigure_keeps_latest_configuration() {
        let mut editor = FileEditor::new("doc.html");
        let config = Rc::new(EditorConfiguration::default());
        editor.reconfigure(Rc::clone(&config));
        assert!(Rc::ptr_eq(editor.configuration().unwrap(), &config));
    }

    #[test]
    fn test_teardown_stops_watching() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.html");
        std::fs::write(&path, "<p>x</p>").unwrap();
        let mut editor = FileEditor::watching(&path, Duration::from_millis(10)).unwrap();
        editor.teardown();
        std::fs::write(&path, "<p>y</p>").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(editor.poll_change(), None);
    }

    #[test]
    fn test_settled_write_is_reported_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().canonicalize().unwrap().join("doc.html");
        std::fs::write(&path, "<p>before</p>").unwrap();
        let mut editor = FileEditor::watching(&path, Duration::from_millis(50))
            .unwrap()
            .seeded("<p>before</p>", Rc::new(EditorConfiguration::default()));

        std::thread::sleep(Duration::from_millis(500));
        std::fs::write(&path, "<p>after</p>").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut change = None;
        while Instant::now() < deadline {
            if let Some(value) = editor.poll_change() {
                change = Some(value);
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        assert_eq!(change.as_deref(), Some("<p>after</p>"));
        assert_eq!(editor.poll_change(), None);
    }
}
