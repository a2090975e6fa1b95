//! Error type shared by every template operation.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors returned by [`TemplateDocument`](crate::TemplateDocument) and the package layer.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file does not exist.
    #[error("No template found at this location: {}", .0.display())]
    NotFound(PathBuf),

    /// No paragraph contains the requested text.
    #[error("Document does not contain a paragraph starting with {0:?}")]
    ParagraphNotFound(String),

    /// The caller broke an argument contract (empty phrase, empty stream).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The package is not a readable word-processing document.
    #[error("malformed document {}: {reason}", .path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    /// A filesystem operation was refused.
    #[error("access denied: {}", .path.display())]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other filesystem failure.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The working copy was already released.
    #[error("template document has been released")]
    Released,
}

pub type Result<T> = std::result::Result<T, TemplateError>;

impl TemplateError {
    /// Wraps an I/O failure on `path`, splitting out permission errors.
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::AccessDenied { path, source },
            _ => Self::Io { path, source },
        }
    }

    pub(crate) fn malformed(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Adds the offending path to bare `io::Result`s.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| TemplateError::io(path, e))
    }
}
