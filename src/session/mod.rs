//! The editing session: content, configuration, editor and preview wired
//! together.
//!
//! This module follows The Elm Architecture (TEA):
//! - [`Session`]: the complete state of one embedded editor
//! - [`Message`]: everything that can happen to it
//! - [`Session::update`]: one message processed to completion at a time

mod file_editor;

pub use file_editor::FileEditor;

use std::path::PathBuf;
use std::rc::Rc;

use thiserror::Error;

use crate::content::{ContentState, SubscriptionId};
use crate::editor::{
    ConfigCache, ConfigurationError, EditorConfiguration, EditorHandle, ExternalEditor,
};
use crate::preview::{PreviewRenderer, SafeMarkup, SanitizePolicy};
use crate::store::{ContentStore, StoreError};

/// Content shown when nothing has been saved yet.
pub const DEFAULT_SEED: &str = "Worlds best html page";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no content store is attached")]
    NoStore,
    #[error("the editor is not mounted")]
    NotMounted,
}

/// Where the editor configuration comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Fixed policy values; computed once per session.
    Static(EditorConfiguration),
    /// A JSON file; recomputed only when the path changes or on reload.
    File(PathBuf),
}

impl Default for ConfigSource {
    fn default() -> Self {
        Self::Static(EditorConfiguration::default())
    }
}

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// The editor emitted its full serialized content
    ContentChanged(String),
    /// Drain pending change events from the mounted editor
    PollEditor,
    /// Move focus into the editor
    Focus,
    /// Persist the current content to the attached store
    Save,
    /// Drop the cached configuration and recompute it
    ReloadConfiguration,
    /// Tear the editor down
    Unmount,
}

/// One embedded editor with its content and preview.
pub struct Session<E> {
    content: ContentState,
    config_source: ConfigSource,
    config_cache: ConfigCache<EditorConfiguration>,
    handle: EditorHandle<E>,
    base_policy: SanitizePolicy,
    renderer: Option<(Rc<EditorConfiguration>, PreviewRenderer)>,
    preview: Option<(u64, SafeMarkup)>,
    store: Option<Box<dyn ContentStore>>,
}

impl<E: ExternalEditor> Session<E> {
    /// Create a session holding `seed`.
    pub fn new(seed: impl Into<String>, config_source: ConfigSource) -> Self {
        Self {
            content: ContentState::initialize(seed),
            config_source,
            config_cache: ConfigCache::new(),
            handle: EditorHandle::detached(),
            base_policy: SanitizePolicy::default(),
            renderer: None,
            preview: None,
            store: None,
        }
    }

    /// Create a session seeded from `store`, falling back to `default_seed`
    /// when the store is empty.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn from_store(
        store: Box<dyn ContentStore>,
        default_seed: &str,
        config_source: ConfigSource,
    ) -> Result<Self, SessionError> {
        let seed = store.load()?.unwrap_or_else(|| default_seed.to_string());
        let mut session = Self::new(seed, config_source);
        session.store = Some(store);
        Ok(session)
    }

    /// Attach a store used by [`Message::Save`].
    pub fn with_store(mut self, store: Box<dyn ContentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Base sanitizer policy; inline image formats are layered on top from
    /// the editor configuration.
    pub fn with_policy(mut self, policy: SanitizePolicy) -> Self {
        self.base_policy = policy;
        self.renderer = None;
        self.preview = None;
        self
    }

    /// The editor configuration for this render.
    ///
    /// Returns the same `Rc` on every call until the source changes or
    /// [`Message::ReloadConfiguration`] is processed.
    ///
    /// # Errors
    /// Returns an error if the configuration is malformed.
    pub fn configuration(&mut self) -> Result<Rc<EditorConfiguration>, SessionError> {
        let config = match &self.config_source {
            ConfigSource::Static(config) => {
                let no_dependencies: &[PathBuf] = &[];
                self.config_cache
                    .get_or_try_init(no_dependencies, || {
                        config.validate()?;
                        Ok::<_, ConfigurationError>(config.clone())
                    })?
            }
            ConfigSource::File(path) => self
                .config_cache
                .get_or_try_init(std::slice::from_ref(path), || {
                    EditorConfiguration::load(path)
                })?,
        };
        Ok(config)
    }

    /// Switch to a different configuration source.
    pub fn set_config_source(&mut self, source: ConfigSource) {
        self.config_source = source;
        // A static source has no dependencies to fingerprint, so the cache
        // cannot tell two static sources apart on its own.
        self.config_cache.invalidate();
    }

    /// Mount the external editor with the current content and configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be computed.
    pub fn mount<F>(&mut self, factory: F) -> Result<(), SessionError>
    where
        F: FnOnce(&str, Rc<EditorConfiguration>) -> E,
    {
        let config = self.configuration()?;
        let editor = factory(self.content.current(), Rc::clone(&config));
        self.handle.attach(editor, config);
        tracing::info!(revision = self.content.revision(), "editor mounted");
        Ok(())
    }

    /// Process one message to completion.
    ///
    /// # Errors
    /// Returns an error if the message needs a mounted editor or a store that
    /// is missing, or if saving or recomputing configuration fails.
    pub fn update(&mut self, msg: Message) -> Result<(), SessionError> {
        match msg {
            Message::ContentChanged(value) => {
                self.content.on_change(value);
                self.render_cycle()?;
            }
            Message::PollEditor => {
                let editor = self.handle.get_mut().ok_or(SessionError::NotMounted)?;
                let mut changed = false;
                while let Some(value) = editor.poll_change() {
                    self.content.on_change(value);
                    changed = true;
                }
                // Every drained change is applied before anything can fail.
                if changed {
                    self.render_cycle()?;
                }
            }
            Message::Focus => {
                self.handle
                    .get_mut()
                    .ok_or(SessionError::NotMounted)?
                    .focus();
            }
            Message::Save => {
                let store = self.store.as_ref().ok_or(SessionError::NoStore)?;
                store.save(self.content.current())?;
                self.content.mark_clean();
            }
            Message::ReloadConfiguration => {
                self.config_cache.invalidate();
                self.render_cycle()?;
            }
            Message::Unmount => {
                if self.handle.release().is_some() {
                    tracing::info!("editor unmounted");
                }
            }
        }
        Ok(())
    }

    /// Re-derive configuration the way every re-render does, forwarding it
    /// to the editor only when its identity changed.
    fn render_cycle(&mut self) -> Result<(), SessionError> {
        let config = self.configuration()?;
        self.handle.sync_configuration(&config);
        Ok(())
    }

    /// Sanitized preview of the current content.
    ///
    /// Rendered lazily and cached per content revision and configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be computed.
    pub fn preview(&mut self) -> Result<&SafeMarkup, SessionError> {
        let config = self.configuration()?;
        let renderer = match self.renderer.take() {
            Some((for_config, renderer)) if Rc::ptr_eq(&for_config, &config) => {
                (for_config, renderer)
            }
            _ => {
                let policy = self.base_policy.clone().with_uploader(&config.uploader);
                self.preview = None;
                (config, PreviewRenderer::new(policy))
            }
        };
        let renderer = &self.renderer.insert(renderer).1;

        let revision = self.content.revision();
        let preview = match self.preview.take() {
            Some((rendered_at, markup)) if rendered_at == revision => (rendered_at, markup),
            _ => (revision, renderer.render(self.content.current())),
        };
        Ok(&self.preview.insert(preview).1)
    }

    /// The current content state.
    pub const fn content(&self) -> &ContentState {
        &self.content
    }

    /// Register a change listener on the content.
    pub fn subscribe(&mut self, listener: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.content.subscribe(listener)
    }

    /// Imperative access to the mounted editor.
    pub const fn editor_mut(&mut self) -> Option<&mut E> {
        self.handle.get_mut()
    }

    /// Whether an editor is mounted.
    pub const fn is_mounted(&self) -> bool {
        self.handle.is_attached()
    }
}

impl<E> std::fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("content", &self.content)
            .field("config_source", &self.config_source)
            .field("config_computations", &self.config_cache.computations())
            .field("has_store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::testing::ScriptedEditor;
    use crate::store::MemoryStore;
    use std::cell::RefCell;

    fn mounted(edits: &[&str]) -> Session<ScriptedEditor> {
        let mut session = Session::new(DEFAULT_SEED, ConfigSource::default());
        let edits: Vec<String> = edits.iter().map(|e| (*e).to_string()).collect();
        session
            .mount(move |_, config| ScriptedEditor {
                pending: edits.into(),
                last_configuration: Some(config),
                ..ScriptedEditor::default()
            })
            .unwrap();
        session
    }

    #[test]
    fn test_new_session_holds_seed() {
        let session: Session<ScriptedEditor> = Session::new("Hello", ConfigSource::default());
        assert_eq!(session.content().current(), "Hello");
        assert!(!session.is_mounted());
    }

    #[test]
    fn test_mount_passes_initial_value_and_configuration() {
        let mut session: Session<ScriptedEditor> =
            Session::new("<p>start</p>", ConfigSource::default());
        let seen = Rc::new(RefCell::new(String::new()));
        let seen_in_factory = Rc::clone(&seen);
        session
            .mount(move |initial, _| {
                seen_in_factory.borrow_mut().push_str(initial);
                ScriptedEditor::default()
            })
            .unwrap();
        assert_eq!(*seen.borrow(), "<p>start</p>");
        assert!(session.is_mounted());
    }

    #[test]
    fn test_content_change_does_not_reconfigure_editor() {
        let mut session = mounted(&[]);
        let before = session.configuration().unwrap();
        for i in 0..5 {
            session
                .update(Message::ContentChanged(format!("<p>{i}</p>")))
                .unwrap();
        }
        let after = session.configuration().unwrap();
        assert!(Rc::ptr_eq(&before, &after));
        assert_eq!(session.editor_mut().unwrap().reconfigured, 0);
        assert_eq!(session.content().current(), "<p>4</p>");
    }

    #[test]
    fn test_poll_editor_applies_changes_in_order() {
        let mut session = mounted(&["<p>a</p>", "<p>ab</p>"]);
        session.update(Message::PollEditor).unwrap();
        assert_eq!(session.content().current(), "<p>ab</p>");
        assert_eq!(session.content().revision(), 2);
    }

    #[test]
    fn test_poll_keeps_every_change_when_configuration_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("editor.json");
        std::fs::write(&config_path, "{}").unwrap();
        let mut session: Session<ScriptedEditor> =
            Session::new("", ConfigSource::File(config_path.clone()));
        session
            .mount(|_, _| ScriptedEditor::with_edits(&["<p>a</p>", "<p>b</p>"]))
            .unwrap();

        std::fs::write(&config_path, "{ not json").unwrap();
        let result = session.update(Message::ReloadConfiguration);
        assert!(matches!(result, Err(SessionError::Configuration(_))));

        let result = session.update(Message::PollEditor);
        assert!(matches!(result, Err(SessionError::Configuration(_))));
        assert_eq!(session.content().current(), "<p>b</p>");
        assert_eq!(session.content().revision(), 2);
        assert!(session.editor_mut().unwrap().pending.is_empty());

        std::fs::write(&config_path, "{}").unwrap();
        session.update(Message::PollEditor).unwrap();
        session.update(Message::ReloadConfiguration).unwrap();
        assert_eq!(session.content().current(), "<p>b</p>");
        assert_eq!(session.preview().unwrap().as_str(), "<p>b</p>");
    }

    #[test]
    fn test_reload_configuration_reconfigures_once() {
        let mut session = mounted(&[]);
        session.update(Message::ReloadConfiguration).unwrap();
        assert_eq!(session.editor_mut().unwrap().reconfigured, 1);
        session
            .update(Message::ContentChanged("x".to_string()))
            .unwrap();
        assert_eq!(session.editor_mut().unwrap().reconfigured, 1);
    }

    #[test]
    fn test_focus_requires_mounted_editor() {
        let mut session: Session<ScriptedEditor> = Session::new("", ConfigSource::default());
        assert!(matches!(
            session.update(Message::Focus),
            Err(SessionError::NotMounted)
        ));

        let mut session = mounted(&[]);
        session.update(Message::Focus).unwrap();
        assert_eq!(session.editor_mut().unwrap().focused, 1);
    }

    #[test]
    fn test_unmount_releases_editor() {
        let mut session = mounted(&[]);
        session.update(Message::Unmount).unwrap();
        assert!(!session.is_mounted());
        assert!(matches!(
            session.update(Message::PollEditor),
            Err(SessionError::NotMounted)
        ));
    }

    #[test]
    fn test_save_writes_store_and_marks_clean() {
        let mut session: Session<ScriptedEditor> =
            Session::new("", ConfigSource::default()).with_store(Box::new(MemoryStore::new()));
        session
            .update(Message::ContentChanged("<p>keep</p>".to_string()))
            .unwrap();
        assert!(session.content().is_dirty());
        session.update(Message::Save).unwrap();
        assert!(!session.content().is_dirty());
    }

    #[test]
    fn test_save_without_store_fails() {
        let mut session: Session<ScriptedEditor> = Session::new("", ConfigSource::default());
        assert!(matches!(
            session.update(Message::Save),
            Err(SessionError::NoStore)
        ));
    }

    #[test]
    fn test_from_store_prefers_stored_content() {
        let session: Session<ScriptedEditor> = Session::from_store(
            Box::new(MemoryStore::with_content("<p>stored</p>")),
            DEFAULT_SEED,
            ConfigSource::default(),
        )
        .unwrap();
        assert_eq!(session.content().current(), "<p>stored</p>");

        let session: Session<ScriptedEditor> =
            Session::from_store(Box::new(MemoryStore::new()), DEFAULT_SEED, ConfigSource::default())
                .unwrap();
        assert_eq!(session.content().current(), DEFAULT_SEED);
    }

    #[test]
    fn test_preview_is_sanitized_and_cached_per_revision() {
        let mut session = mounted(&[]);
        session
            .update(Message::ContentChanged(
                "<p onclick=\"x()\">hi</p><script>x()</script>".to_string(),
            ))
            .unwrap();
        let first = session.preview().unwrap().clone();
        assert_eq!(first.as_str(), "<p>hi</p>");
        let second = session.preview().unwrap().clone();
        assert_eq!(first, second);

        session
            .update(Message::ContentChanged("<b>bold</b>".to_string()))
            .unwrap();
        assert_eq!(session.preview().unwrap().as_str(), "<b>bold</b>");
    }

    #[test]
    fn test_preview_accepts_inline_images_from_uploader_policy() {
        let mut session = mounted(&[]);
        let html = r#"<img src="data:image/png;base64,iVBORw0KGgo=" alt="dot">"#;
        session
            .update(Message::ContentChanged(html.to_string()))
            .unwrap();
        assert_eq!(session.preview().unwrap().as_str(), html);
    }

    #[test]
    fn test_invalid_static_configuration_is_fatal_at_mount() {
        let mut config = EditorConfiguration::default();
        config.uploader.images_extensions.clear();
        let mut session: Session<ScriptedEditor> = Session::new("", ConfigSource::Static(config));
        let result = session.mount(|_, _| ScriptedEditor::default());
        assert!(matches!(
            result,
            Err(SessionError::Configuration(
                ConfigurationError::EmptyImageExtensions
            ))
        ));
        assert!(!session.is_mounted());
    }

    #[test]
    fn test_subscribers_see_editor_changes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut session = mounted(&["<p>one</p>"]);
        let sink = Rc::clone(&seen);
        session.subscribe(move |value| sink.borrow_mut().push(value.to_string()));
        session.update(Message::PollEditor).unwrap();
        assert_eq!(*seen.borrow(), vec!["<p>one</p>".to_string()]);
    }
}
