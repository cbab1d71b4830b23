//! Document content state.
//!
//! [`ContentState`] is the single source of truth for the HTML the editor
//! produced. Every change is a full replacement: the editor always emits the
//! complete serialized document, never a diff.

use std::fmt;

/// Identifies a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&str)>;

/// Current document content plus change bookkeeping.
///
/// Mutation goes through `&mut self`, so there is exactly one writer and one
/// change is processed to completion before the next is accepted.
pub struct ContentState {
    value: String,
    revision: u64,
    dirty: bool,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_listener: u64,
}

impl ContentState {
    /// Create state holding `seed`.
    pub fn initialize(seed: impl Into<String>) -> Self {
        Self {
            value: seed.into(),
            revision: 0,
            dirty: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Replace the held content with `new_value`.
    ///
    /// Listeners run in registration order, and only when the value differs
    /// from what was held before.
    pub fn on_change(&mut self, new_value: impl Into<String>) {
        let new_value = new_value.into();
        let changed = new_value != self.value;
        self.value = new_value;
        self.revision += 1;
        if !changed {
            return;
        }
        self.dirty = true;
        tracing::debug!(
            revision = self.revision,
            bytes = self.value.len(),
            "content replaced"
        );
        for (_, listener) in &mut self.listeners {
            listener(&self.value);
        }
    }

    /// The latest content.
    pub fn current(&self) -> &str {
        &self.value
    }

    /// Number of change notifications accepted so far.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the content changed since creation or the last save.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the content as persisted.
    pub const fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Register a listener called with the new content after each change.
    pub fn subscribe(&mut self, listener: impl FnMut(&str) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }
}

impl fmt::Debug for ContentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentState")
            .field("value", &format_args!("{} bytes", self.value.len()))
            .field("revision", &self.revision)
            .field("dirty", &self.dirty)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_initialize_holds_seed() {
        let state = ContentState::initialize("Hello");
        assert_eq!(state.current(), "Hello");
        assert_eq!(state.revision(), 0);
        assert!(!state.is_dirty());
    }

    #[test]
    fn test_on_change_replaces_content() {
        let mut state = ContentState::initialize("Hello");
        state.on_change("<p>World</p>");
        assert_eq!(state.current(), "<p>World</p>");
        assert!(state.is_dirty());
    }

    #[test]
    fn test_on_change_is_not_a_merge() {
        let mut state = ContentState::initialize("<p>one</p>");
        state.on_change("<p>one</p><p>two</p>");
        state.on_change("");
        assert_eq!(state.current(), "");
        assert_eq!(state.revision(), 2);
    }

    #[test]
    fn test_listeners_receive_new_value_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut state = ContentState::initialize("");
        let first = Rc::clone(&seen);
        state.subscribe(move |value| first.borrow_mut().push(format!("a:{value}")));
        let second = Rc::clone(&seen);
        state.subscribe(move |value| second.borrow_mut().push(format!("b:{value}")));

        state.on_change("x");
        assert_eq!(*seen.borrow(), vec!["a:x", "b:x"]);
    }

    #[test]
    fn test_identical_value_does_not_notify() {
        let calls = Rc::new(RefCell::new(0));
        let mut state = ContentState::initialize("same");
        let counter = Rc::clone(&calls);
        state.subscribe(move |_| *counter.borrow_mut() += 1);

        state.on_change("same");
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(state.revision(), 1);
        assert!(!state.is_dirty());
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let calls = Rc::new(RefCell::new(0));
        let mut state = ContentState::initialize("");
        let counter = Rc::clone(&calls);
        let id = state.subscribe(move |_| *counter.borrow_mut() += 1);

        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
        state.on_change("changed");
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_mark_clean_resets_dirty() {
        let mut state = ContentState::initialize("");
        state.on_change("edited");
        state.mark_clean();
        assert!(!state.is_dirty());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn last_change_wins(
                seed in ".*",
                changes in proptest::collection::vec(".*", 1..20),
            ) {
                let mut state = ContentState::initialize(seed);
                for change in &changes {
                    state.on_change(change.clone());
                }
                prop_assert_eq!(state.current(), changes.last().unwrap().as_str());
                prop_assert_eq!(state.revision(), changes.len() as u64);
            }
        }
    }
}
