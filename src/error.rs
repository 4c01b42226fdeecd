use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for textbundle operations
pub type Result<T> = std::result::Result<T, TextBundleError>;

/// Unified error type for all textbundle operations
#[derive(Debug, Error)]
pub enum TextBundleError {
    // Package errors
    #[error("Invalid bundle format: {0}")]
    InvalidFormat(String),

    #[error("Bundle not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid asset path: {0}")]
    InvalidAssetPath(String),

    // I/O errors
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // TextPack errors
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TextBundleError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TextBundleError::Io {
            path: path.into(),
            source,
        }
    }

    /// The offending path, for errors that carry one
    pub fn path(&self) -> Option<&Path> {
        match self {
            TextBundleError::Io { path, .. } | TextBundleError::NotFound(path) => Some(path),
            _ => None,
        }
    }
}

/// Attach a path to bare `io::Result`s
pub(crate) trait IoResultExt<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|e| TextBundleError::io(path, e))
    }
}

impl From<walkdir::Error> for TextBundleError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop detected"));
        TextBundleError::Io { path, source }
    }
}
