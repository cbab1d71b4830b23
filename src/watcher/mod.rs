//! Settled-write detection for the document file.
//!
//! A save from an external editor arrives as a burst of file system events
//! (truncate, write, rename of a temp file). [`FileWatcher`] collapses each
//! burst into one "document settled" signal once no event has arrived for
//! the debounce period.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Quiet period used by the command-line host.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Trailing-edge debounce: fires once, `quiet` after the last event.
#[derive(Debug, Clone, Copy)]
struct Debouncer {
    quiet: Duration,
    last_event: Option<Instant>,
}

impl Debouncer {
    const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_event: None,
        }
    }

    fn record(&mut self, at: Instant) {
        self.last_event = Some(at);
    }

    fn fire(&mut self, now: Instant) -> bool {
        match self.last_event {
            Some(at) if now.saturating_duration_since(at) >= self.quiet => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }
}

/// The file being watched and the directory whose events can affect it.
#[derive(Debug, Clone)]
struct WatchTarget {
    file: PathBuf,
    file_name: Option<OsString>,
    directory: PathBuf,
}

impl WatchTarget {
    fn new(path: &Path) -> Self {
        // Backends report canonical paths.
        let file = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let directory = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            file_name: file.file_name().map(OsString::from),
            file,
            directory,
        }
    }

    /// Events on the directory itself count: some backends report a rename
    /// into place only there.
    fn is_affected_by(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            *path == self.file
                || *path == self.directory
                || path.file_name().is_some_and(|name| {
                    self.file_name.as_deref() == Some(name)
                })
        })
    }
}

/// Watches one document and reports when a burst of writes has settled.
pub struct FileWatcher {
    // Dropping the backend stops event delivery.
    _backend: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    target: WatchTarget,
    debouncer: Debouncer,
}

impl FileWatcher {
    /// Start watching `path`.
    ///
    /// The containing directory is watched, not the file, so editors that
    /// save by writing a new file and renaming it over the old one are seen.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be created or the directory
    /// cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        let target = WatchTarget::new(path.as_ref());
        let (tx, events) = mpsc::channel();
        let mut backend = notify::recommended_watcher(move |event| {
            // The receiver is gone only after the watcher is dropped.
            let _ = tx.send(event);
        })?;
        backend.watch(&target.directory, RecursiveMode::NonRecursive)?;
        tracing::debug!(
            file = %target.file.display(),
            directory = %target.directory.display(),
            ?debounce,
            "watching document"
        );
        Ok(Self {
            _backend: backend,
            events,
            target,
            debouncer: Debouncer::new(debounce),
        })
    }

    /// The canonical path of the watched document.
    pub fn target_path(&self) -> &Path {
        &self.target.file
    }

    /// Drain pending events and report whether the document has settled
    /// since the last time this returned `true`.
    pub fn poll_settled(&mut self) -> bool {
        loop {
            match self.events.try_recv() {
                Ok(Ok(event)) if self.target.is_affected_by(&event) => {
                    self.debouncer.record(Instant::now());
                }
                Ok(Ok(event)) => {
                    tracing::trace!(kind = ?event.kind, paths = ?event.paths, "unrelated event");
                }
                Ok(Err(err)) => tracing::warn!(error = %err, "file watcher error"),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("file watcher backend stopped");
                    break;
                }
            }
        }
        self.debouncer.fire(Instant::now())
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("target", &self.target)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use tempfile::tempdir;

    fn touching(path: PathBuf) -> Event {
        Event::new(EventKind::Any).add_path(path)
    }

    #[test]
    fn test_debouncer_fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        assert!(!debouncer.fire(start));

        debouncer.record(start);
        assert!(!debouncer.fire(start + Duration::from_millis(50)));
        assert!(debouncer.fire(start + Duration::from_millis(100)));
        assert!(!debouncer.fire(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_debouncer_restarts_on_each_event() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.record(start);
        debouncer.record(start + Duration::from_millis(80));
        assert!(!debouncer.fire(start + Duration::from_millis(120)));
        assert!(debouncer.fire(start + Duration::from_millis(180)));
    }

    #[test]
    fn test_target_matches_file_and_directory_only() {
        let dir = tempdir().unwrap();
        let directory = dir.path().canonicalize().unwrap();
        let file = directory.join("doc.html");
        std::fs::write(&file, "<p>hi</p>").unwrap();
        let target = WatchTarget::new(&file);

        assert!(target.is_affected_by(&touching(file.clone())));
        assert!(target.is_affected_by(&touching(directory.clone())));
        assert!(!target.is_affected_by(&touching(directory.join("doc.html.tmp"))));
        assert!(!target.is_affected_by(&touching(directory.join("other.html"))));
    }

    #[test]
    fn test_target_for_bare_file_name_uses_current_directory() {
        let target = WatchTarget::new(Path::new("no-such-draft.html"));
        assert_eq!(target.directory, PathBuf::from("."));
        assert_eq!(
            target.file_name.as_deref(),
            Some(std::ffi::OsStr::new("no-such-draft.html"))
        );
    }

    #[test]
    fn test_settles_after_real_write() {
        let dir = tempdir().unwrap();
        let file = dir.path().canonicalize().unwrap().join("watched.html");
        std::fs::write(&file, "<p>original</p>").unwrap();
        let mut watcher = FileWatcher::new(&file, Duration::from_millis(50)).unwrap();
        assert_eq!(watcher.target_path(), file);

        // Let the backend register the watch before writing.
        std::thread::sleep(Duration::from_millis(500));
        std::fs::write(&file, "<p>modified</p>").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut settled = false;
        while !settled && Instant::now() < deadline {
            settled = watcher.poll_settled();
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(settled, "write was not reported within 5 seconds");
    }
}
