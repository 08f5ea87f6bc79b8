use std::path::PathBuf;

use thiserror::Error;

/// Everything a scan can fail with.
///
/// `RootNotFound`, `NotADirectory` and `InvalidConfig` are returned when a
/// scanner is built. `Io` and `ListerPanicked` arrive inside the entry stream
/// and only affect one directory.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A root could not be inspected.
    #[error("root not found: {path}")]
    RootNotFound {
        /// The root as given.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A root exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Rejected option such as a zero worker cap or a bad pattern.
    #[error("invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// Opening or reading one directory failed.
    #[error("failed to list {path}: {source}")]
    Io {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The lister panicked while listing one directory.
    #[error("listing {path} panicked: {message}")]
    ListerPanicked {
        /// Directory being listed.
        path: PathBuf,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl ScanError {
    /// Per-directory I/O failure.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }

    /// Path the error refers to, when it carries one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            ScanError::RootNotFound { path, .. }
            | ScanError::NotADirectory(path)
            | ScanError::Io { path, .. }
            | ScanError::ListerPanicked { path, .. } => Some(path),
            ScanError::InvalidConfig(_) => None,
        }
    }

    /// Whether this error is reported on the data plane (per directory) rather
    /// than at construction time.
    pub fn is_entry_error(&self) -> bool {
        matches!(
            self,
            ScanError::Io { .. } | ScanError::ListerPanicked { .. }
        )
    }
}

/// Result type for scanner construction.
pub type Result<T> = std::result::Result<T, ScanError>;
