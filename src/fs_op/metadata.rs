//! Permission bits, ownership and umask helpers.
//!
//! Every helper reports failures as `FsOpError::Path` so the operation name
//! survives into probe results.

use std::fs;
use std::path::Path;

use crate::fs_op::error::{FsOpError, IoResultExt};

/// Mask selecting the nine `rwxrwxrwx` permission bits.
pub const PERM_BITS: u32 = 0o777;

/// Set the permission bits of `path` to exactly `mode` (chmod is not
/// subject to the umask).
pub fn set_mode(path: &Path, mode: u32) -> Result<(), FsOpError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).with_path("chmod", path)
}

/// Permission bits of `path` (without file type bits). Does not follow a
/// trailing symlink.
pub fn mode_of(path: &Path) -> Result<u32, FsOpError> {
    use std::os::unix::fs::PermissionsExt;
    let meta = fs::symlink_metadata(path).with_path("lstat", path)?;
    Ok(meta.permissions().mode() & PERM_BITS)
}

/// Change owner and group of `path`.
pub fn chown_ids(path: &Path, uid: u32, gid: u32) -> Result<(), FsOpError> {
    use nix::unistd::{chown, Gid, Uid};
    chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
        .map_err(|errno| FsOpError::path("chown", path, errno.into()))
}

/// Read the process umask.
///
/// POSIX only offers a read-and-replace call, so the mask is set and then
/// immediately put back.
pub fn current_umask() -> u32 {
    use nix::sys::stat::{umask, Mode};
    let old = umask(Mode::from_bits_truncate(0o022));
    umask(old);
    old.bits() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_and_read_mode() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("f");
        fs::write(&f, b"x").unwrap();
        for mode in [0o000, 0o644, 0o755, 0o777] {
            set_mode(&f, mode).unwrap();
            assert_eq!(mode_of(&f).unwrap(), mode);
        }
    }

    #[test]
    fn chown_to_self_succeeds() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("f");
        fs::write(&f, b"x").unwrap();
        let uid = nix::unistd::geteuid().as_raw();
        let gid = nix::unistd::getegid().as_raw();
        chown_ids(&f, uid, gid).unwrap();
    }

    #[test]
    fn missing_path_reports_operation() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        match set_mode(&missing, 0o600) {
            Err(FsOpError::Path { op, path, .. }) => {
                assert_eq!(op, "chmod");
                assert_eq!(path, missing);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn umask_is_left_unchanged() {
        let first = current_umask();
        let second = current_umask();
        assert_eq!(first, second);
        assert_eq!(first & !PERM_BITS, 0);
    }
}
