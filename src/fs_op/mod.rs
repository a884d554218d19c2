//! Filesystem collaborator used to build permission fixtures, plus the
//! reference probes and error shapes they report.

pub mod create;
pub mod error;
pub mod helpers;
pub mod metadata;
pub mod probes;
pub mod remove;

use std::path::Path;

pub use error::{FsOpError, IoResultExt};

/// The narrow filesystem interface the harness needs from an implementation
/// under test.
///
/// Modes are the nine permission bits; implementations must apply them
/// exactly, without masking by any umask.
pub trait PermFs {
    /// Create an empty file with exactly `mode`.
    fn create_file(&self, path: &Path, mode: u32) -> Result<(), FsOpError>;
    /// Create a directory with exactly `mode`.
    fn create_dir(&self, path: &Path, mode: u32) -> Result<(), FsOpError>;
    fn chmod(&self, path: &Path, mode: u32) -> Result<(), FsOpError>;
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<(), FsOpError>;
    /// Current umask, for diagnostics.
    fn umask(&self) -> u32;
    /// Remove a fixture tree regardless of the modes inside it.
    fn remove_all(&self, path: &Path) -> Result<(), FsOpError>;
}

/// `PermFs` backed by the host operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl PermFs for OsFs {
    fn create_file(&self, path: &Path, mode: u32) -> Result<(), FsOpError> {
        create::create_file_mode(path, mode)
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<(), FsOpError> {
        create::create_dir_mode(path, mode)
    }

    fn chmod(&self, path: &Path, mode: u32) -> Result<(), FsOpError> {
        metadata::set_mode(path, mode)
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<(), FsOpError> {
        metadata::chown_ids(path, uid, gid)
    }

    fn umask(&self) -> u32 {
        metadata::current_umask()
    }

    fn remove_all(&self, path: &Path) -> Result<(), FsOpError> {
        remove::remove_relaxed(path).map_err(|e| FsOpError::path("remove", path, e.0))
    }
}
