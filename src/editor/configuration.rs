use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Image formats the uploader accepts when nothing else is configured.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "jpeg", "gif", "svg", "webp"];

/// Errors raised while building an [`EditorConfiguration`].
///
/// These are fatal at startup: the editor is never mounted with a
/// configuration that failed validation.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read editor configuration {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse editor configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("base64 image insertion is enabled but no image extensions are accepted")]
    EmptyImageExtensions,
    #[error("invalid image extension {0:?}")]
    InvalidImageExtension(String),
    #[error("image extension {0:?} is listed more than once")]
    DuplicateImageExtension(String),
}

/// Image upload behavior handed to the external editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderPolicy {
    /// Insert uploaded images inline as `data:` URIs instead of uploading them.
    #[serde(rename = "insertImageAsBase64URI")]
    pub insert_image_as_base64_uri: bool,
    /// Accepted image file extensions, without the leading dot.
    #[serde(rename = "imagesExtensions")]
    pub images_extensions: Vec<String>,
}

impl Default for UploaderPolicy {
    fn default() -> Self {
        Self {
            insert_image_as_base64_uri: true,
            images_extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_string())
                .collect(),
        }
    }
}

impl UploaderPolicy {
    /// Whether `ext` (case-insensitive, no leading dot) is an accepted format.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.images_extensions
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(ext))
    }
}

/// Options describing editor behavior.
///
/// Values are immutable once built; share them as `Rc<EditorConfiguration>`
/// through [`super::ConfigCache`] so the editor sees the same identity on
/// every render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfiguration {
    pub uploader: UploaderPolicy,
}

impl EditorConfiguration {
    /// Load a configuration from a JSON file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no editor configuration, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|source| ConfigurationError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            serde_json::from_str(json).map_err(|source| ConfigurationError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the static policy values.
    ///
    /// # Errors
    /// Returns the first malformed value found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let uploader = &self.uploader;
        if uploader.insert_image_as_base64_uri && uploader.images_extensions.is_empty() {
            return Err(ConfigurationError::EmptyImageExtensions);
        }
        let mut seen = HashSet::new();
        for ext in &uploader.images_extensions {
            if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(ConfigurationError::InvalidImageExtension(ext.clone()));
            }
            if !seen.insert(ext.to_ascii_lowercase()) {
                return Err(ConfigurationError::DuplicateImageExtension(ext.clone()));
            }
        }
        Ok(())
    }
}
