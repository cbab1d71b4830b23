use std::rc::Rc;

use super::EditorConfiguration;

/// Contract implemented by the embedded WYSIWYG widget.
///
/// The widget owns toolbar, DOM and image conversion; the core only mounts
/// it, forwards configuration changes, and drains its change events.
pub trait ExternalEditor {
    /// Reapply a configuration with a new identity.
    ///
    /// Implementations may reinitialize here, losing cursor and undo state,
    /// which is why callers only invoke it when the identity changes.
    fn reconfigure(&mut self, configuration: Rc<EditorConfiguration>);

    /// Move input focus into the editor.
    fn focus(&mut self);

    /// Next full serialized content emitted by the editor, if any.
    fn poll_change(&mut self) -> Option<String>;

    /// Release widget resources.
    fn teardown(&mut self) {}
}

/// Single-owner reference to the mounted editor instance.
///
/// Attached once at mount and only replaced on teardown or reinitialization.
#[derive(Debug)]
pub struct EditorHandle<E> {
    editor: Option<E>,
    configuration: Option<Rc<EditorConfiguration>>,
}

impl<E: ExternalEditor> EditorHandle<E> {
    /// An empty handle (nothing mounted yet).
    pub const fn detached() -> Self {
        Self {
            editor: None,
            configuration: None,
        }
    }

    /// Take ownership of a freshly mounted editor.
    ///
    /// Any previously attached editor is torn down first.
    pub fn attach(&mut self, editor: E, configuration: Rc<EditorConfiguration>) {
        self.release();
        self.editor = Some(editor);
        self.configuration = Some(configuration);
    }

    /// Whether an editor is attached.
    pub const fn is_attached(&self) -> bool {
        self.editor.is_some()
    }

    /// Imperative access to the attached editor.
    pub const fn get_mut(&mut self) -> Option<&mut E> {
        self.editor.as_mut()
    }

    /// Shared access to the attached editor.
    pub const fn get(&self) -> Option<&E> {
        self.editor.as_ref()
    }

    /// Forward `configuration` only if its identity differs from the one the
    /// editor was last given. Returns `true` when the editor was reconfigured.
    pub fn sync_configuration(&mut self, configuration: &Rc<EditorConfiguration>) -> bool {
        let Some(editor) = self.editor.as_mut() else {
            return false;
        };
        if self
            .configuration
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, configuration))
        {
            return false;
        }
        tracing::info!("editor configuration identity changed, reconfiguring");
        editor.reconfigure(Rc::clone(configuration));
        self.configuration = Some(Rc::clone(configuration));
        true
    }

    /// Tear down and drop the attached editor, if any.
    pub fn release(&mut self) -> Option<E> {
        let mut editor = self.editor.take()?;
        editor.teardown();
        self.configuration = None;
        Some(editor)
    }
}

impl<E: ExternalEditor> Default for EditorHandle<E> {
    fn default() -> Self {
        Self::detached()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::ExternalEditor;
    use crate::editor::EditorConfiguration;

    /// Scripted editor used across the crate's unit tests.
    #[derive(Debug, Default)]
    pub struct ScriptedEditor {
        pub pending: VecDeque<String>,
        pub reconfigured: usize,
        pub focused: usize,
        pub torn_down: bool,
        pub last_configuration: Option<Rc<EditorConfiguration>>,
    }

    impl ScriptedEditor {
        pub fn with_edits(edits: &[&str]) -> Self {
            Self {
                pending: edits.iter().map(|e| (*e).to_string()).collect(),
                ..Self::default()
            }
        }
    }

    impl ExternalEditor for ScriptedEditor {
        fn reconfigure(&mut self, configuration: Rc<EditorConfiguration>) {
            self.reconfigured += 1;
            self.last_configuration = Some(configuration);
        }

        fn focus(&mut self) {
            self.focused += 1;
        }

        fn poll_change(&mut self) -> Option<String> {
            self.pending.pop_front()
        }

        fn teardown(&mut self) {
            self.torn_down = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedEditor;
    use super::*;

    #[test]
    fn test_detached_handle_ignores_configuration() {
        let mut handle: EditorHandle<ScriptedEditor> = EditorHandle::detached();
        let config = Rc::new(EditorConfiguration::default());
        assert!(!handle.is_attached());
        assert!(!handle.sync_configuration(&config));
    }

    #[test]
    fn test_same_identity_does_not_reconfigure() {
        let mut handle = EditorHandle::detached();
        let config = Rc::new(EditorConfiguration::default());
        handle.attach(ScriptedEditor::default(), Rc::clone(&config));
        assert!(!handle.sync_configuration(&config));
        assert_eq!(handle.get().unwrap().reconfigured, 0);
    }

    #[test]
    fn test_equal_but_new_identity_reconfigures() {
        let mut handle = EditorHandle::detached();
        handle.attach(
            ScriptedEditor::default(),
            Rc::new(EditorConfiguration::default()),
        );
        let fresh = Rc::new(EditorConfiguration::default());
        assert!(handle.sync_configuration(&fresh));
        assert_eq!(handle.get().unwrap().reconfigured, 1);
    }

    #[test]
    fn test_release_tears_down() {
        let mut handle = EditorHandle::detached();
        handle.attach(
            ScriptedEditor::default(),
            Rc::new(EditorConfiguration::default()),
        );
        let editor = handle.release().unwrap();
        assert!(editor.torn_down);
        assert!(!handle.is_attached());
        assert!(handle.release().is_none());
    }
}
