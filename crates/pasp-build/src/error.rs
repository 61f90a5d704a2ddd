use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pasp_coalesce::CoalesceError;
use pasp_scan::{ScanError, WriteError};

/// Build errors.
///
/// Cloneable so the owner of a request can hand the same failure to every
/// caller that joined it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error("invalid source path {path:?}: {reason}")]
    InvalidArgument { path: String, reason: &'static str },

    #[error(transparent)]
    Coalesce(#[from] CoalesceError),

    #[error("not found: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("permission denied for {}: {reason}", path.display())]
    PermissionDenied { path: PathBuf, reason: String },

    #[error("failed to translate {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: ScanError,
    },

    #[error("cannot buffer {} ({size} bytes)", path.display())]
    OutOfMemory { path: PathBuf, size: u64 },
}

/// Flat classification of [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    Timeout,
    Abandoned,
    NotFound,
    Io,
    PermissionDenied,
    Syntax,
    UnsupportedLanguage,
    Write,
    OutOfMemory,
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            BuildError::Coalesce(CoalesceError::Timeout { .. }) => ErrorKind::Timeout,
            BuildError::Coalesce(CoalesceError::InvalidCapacity) => ErrorKind::InvalidArgument,
            BuildError::Coalesce(_) => ErrorKind::Abandoned,
            BuildError::NotFound { .. } => ErrorKind::NotFound,
            BuildError::Io { .. } => ErrorKind::Io,
            BuildError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            BuildError::Scan { source, .. } => match source {
                ScanError::Syntax { .. } => ErrorKind::Syntax,
                ScanError::UnsupportedLanguage { .. } => ErrorKind::UnsupportedLanguage,
                ScanError::Write(WriteError::OutOfMemory) => ErrorKind::OutOfMemory,
                ScanError::Write(WriteError::Io(_)) => ErrorKind::Write,
            },
            BuildError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
        }
    }

    /// Classify an I/O failure on `path`.
    pub fn io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => BuildError::NotFound {
                path,
                source: Arc::new(err),
            },
            io::ErrorKind::PermissionDenied => BuildError::PermissionDenied {
                path,
                reason: err.to_string(),
            },
            _ => BuildError::Io {
                path,
                source: Arc::new(err),
            },
        }
    }

    pub(crate) fn invalid(path: &str, reason: &'static str) -> Self {
        BuildError::InvalidArgument {
            path: path.to_string(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
