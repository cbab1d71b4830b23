//! Everything the core hands to, or holds of, the external editor widget.
//!
//! Provides the editor configuration, the cache that keeps its identity
//! stable across renders, and the single-owner handle to the mounted widget.

mod cache;
mod configuration;
mod handle;

pub use cache::ConfigCache;
pub use configuration::{
    ConfigurationError, DEFAULT_IMAGE_EXTENSIONS, EditorConfiguration, UploaderPolicy,
};
pub use handle::{EditorHandle, ExternalEditor};

#[cfg(test)]
pub(crate) use handle::testing;
