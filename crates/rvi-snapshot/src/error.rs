//! Snapshot errors.

use std::io;
use std::path::PathBuf;

use rvi_classifier::ClassifyError;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("duplicate path in snapshot: {0}")]
    DuplicatePath(String),

    #[error("path escapes snapshot root: {0:?}")]
    PathEscapesRoot(String),

    #[error("text file is not valid UTF-8: {0}")]
    InvalidText(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
