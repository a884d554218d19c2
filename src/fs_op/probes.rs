//! Reference probes against the host operating system.
//!
//! Each probe performs one filesystem operation and reports failures in the
//! shape the kernel gives them: one subject path for most calls, an old/new
//! pair for `rename`, `link` and `symlink`. Baselines captured with these
//! probes are what simulated filesystems get replayed against.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::fs_op::error::{FsOpError, IoResultExt};

/// `stat(2)` following symlinks.
pub fn stat(path: &Path) -> Result<(), FsOpError> {
    fs::metadata(path).with_path("stat", path).map(|_| ())
}

/// `lstat(2)`.
pub fn lstat(path: &Path) -> Result<(), FsOpError> {
    fs::symlink_metadata(path).with_path("lstat", path).map(|_| ())
}

/// Open `path` for reading.
pub fn open_read(path: &Path) -> Result<(), FsOpError> {
    fs::File::open(path).with_path("open", path).map(|_| ())
}

/// Open an existing `path` for writing without truncating it.
pub fn open_write(path: &Path) -> Result<(), FsOpError> {
    fs::OpenOptions::new()
        .write(true)
        .open(path)
        .with_path("open", path)
        .map(|_| ())
}

/// List the directory at `path`, reading every entry.
pub fn read_dir(path: &Path) -> Result<(), FsOpError> {
    for entry in fs::read_dir(path).with_path("open", path)? {
        entry.with_path("readdirent", path)?;
    }
    Ok(())
}

/// Set the permission bits of `path` to `mode`.
pub fn chmod(path: &Path, mode: u32) -> Result<(), FsOpError> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).with_path("chmod", path)
}

/// Change owner and group of `path`.
pub fn chown(path: &Path, uid: u32, gid: u32) -> Result<(), FsOpError> {
    crate::fs_op::metadata::chown_ids(path, uid, gid)
}

/// Create directory `name` inside the directory at `path`.
pub fn mkdir_in(path: &Path, name: &str) -> Result<(), FsOpError> {
    let child = path.join(name);
    fs::create_dir(&child).with_path("mkdir", &child)
}

/// Create an empty file `name` inside the directory at `path`.
pub fn create_in(path: &Path, name: &str) -> Result<(), FsOpError> {
    let child = path.join(name);
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&child)
        .with_path("open", &child)
        .map(|_| ())
}

/// Remove the file or empty directory at `path`.
pub fn remove(path: &Path) -> Result<(), FsOpError> {
    let meta = fs::symlink_metadata(path).with_path("remove", path)?;
    if meta.is_dir() {
        fs::remove_dir(path).with_path("remove", path)
    } else {
        fs::remove_file(path).with_path("remove", path)
    }
}

/// Truncate the file at `path` to `len` bytes.
pub fn truncate(path: &Path, len: u64) -> Result<(), FsOpError> {
    let f = fs::OpenOptions::new()
        .write(true)
        .open(path)
        .with_path("truncate", path)?;
    f.set_len(len).with_path("truncate", path)
}

/// `rename(2)` from `old` to `new`.
pub fn rename(old: &Path, new: &Path) -> Result<(), FsOpError> {
    fs::rename(old, new).with_link("rename", old, new)
}

/// Create hard link `new` pointing at `old`.
pub fn link(old: &Path, new: &Path) -> Result<(), FsOpError> {
    fs::hard_link(old, new).with_link("link", old, new)
}

/// Create symlink `new` whose target is `old`.
pub fn symlink(old: &Path, new: &Path) -> Result<(), FsOpError> {
    std::os::unix::fs::symlink(old, new).with_link("symlink", old, new)
}
