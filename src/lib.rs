// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. editor::EditorHandle)
    clippy::module_name_repetitions
)]

//! # Jotpad
//!
//! The core of an embeddable rich-text editor with a safe live preview.
//!
//! Jotpad keeps the editor's content, hands the editor a configuration whose
//! identity is stable across re-renders, and turns untrusted content into
//! markup that is safe to display.
//!
//! ## Architecture
//!
//! The session follows The Elm Architecture (TEA) pattern:
//! - **Session**: content, configuration and the mounted editor
//! - **Message**: editor events and host actions
//! - **Update**: one message processed at a time
//! - **Preview**: sanitized rendering of the current content
//!
//! ## Modules
//!
//! - [`editor`]: Configuration, its cache, and the external editor contract
//! - [`content`]: The authoritative content value
//! - [`preview`]: Allow-list HTML sanitizer and renderer
//! - [`session`]: Wiring of content, editor and preview
//! - [`store`]: Content persistence
//! - [`watcher`]: File watching
//! - [`config`]: Saved command-line defaults

pub mod config;
pub mod content;
pub mod editor;
pub mod preview;
pub mod session;
pub mod store;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::content::ContentState;
    pub use crate::editor::{ConfigCache, EditorConfiguration, ExternalEditor};
    pub use crate::preview::{PreviewRenderer, SafeMarkup, SanitizePolicy};
    pub use crate::session::{ConfigSource, Message, Session};
}
