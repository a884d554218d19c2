use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced by filesystem collaborators and probes.
///
/// The variants mirror the shapes operating systems report: an operation on
/// one path, an operation on an old/new pair of paths, or an error with no
/// path attached at all.
#[derive(Error, Debug)]
pub enum FsOpError {
    /// Operation on a single subject path, e.g. `stat` or `chmod`.
    #[error("{op} {}: {source}", .path.display())]
    Path {
        op: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Operation on two subject paths, e.g. `rename` or `link`.
    #[error("{op} {} {}: {source}", .old.display(), .new.display())]
    Link {
        op: String,
        old: PathBuf,
        new: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Wrapper for underlying IO errors that carry no path.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with context message.
    #[error("Filesystem operation failed: {0}")]
    Message(String),
}

impl FsOpError {
    /// Attach `op` and `path` to an IO error.
    pub fn path(op: impl Into<String>, path: impl AsRef<Path>, source: io::Error) -> Self {
        FsOpError::Path {
            op: op.into(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Attach `op` and both subject paths to an IO error.
    pub fn link(
        op: impl Into<String>,
        old: impl AsRef<Path>,
        new: impl AsRef<Path>,
        source: io::Error,
    ) -> Self {
        FsOpError::Link {
            op: op.into(),
            old: old.as_ref().to_path_buf(),
            new: new.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Extension for tagging `io::Result`s with the operation that produced them.
pub trait IoResultExt<T> {
    fn with_path(self, op: &str, path: &Path) -> Result<T, FsOpError>;
    fn with_link(self, op: &str, old: &Path, new: &Path) -> Result<T, FsOpError>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, op: &str, path: &Path) -> Result<T, FsOpError> {
        self.map_err(|e| FsOpError::path(op, path, e))
    }

    fn with_link(self, op: &str, old: &Path, new: &Path) -> Result<T, FsOpError> {
        self.map_err(|e| FsOpError::link(op, old, new, e))
    }
}
