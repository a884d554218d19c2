use std::fs;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::fs_op::error::{FsOpError, IoResultExt};
use crate::fs_op::metadata::set_mode;

/// Create an empty file at `path` whose permission bits are exactly `mode`.
///
/// The file is created owner-writable and then chmod-ed, so the process
/// umask never masks the requested bits. Fails if the file already exists.
pub fn create_file_mode<P: AsRef<Path>>(path: P, mode: u32) -> Result<(), FsOpError> {
    let p = path.as_ref();
    let mut opts = fs::OpenOptions::new();
    opts.write(true).create_new(true);
    opts.mode(0o600);
    opts.open(p).with_path("open", p)?;
    set_mode(p, mode)
}

/// Create a directory at `path` whose permission bits are exactly `mode`.
///
/// The parent must already exist.
pub fn create_dir_mode<P: AsRef<Path>>(path: P, mode: u32) -> Result<(), FsOpError> {
    let p = path.as_ref();
    fs::create_dir(p).with_path("mkdir", p)?;
    set_mode(p, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_op::metadata::mode_of;
    use tempfile::tempdir;

    #[test]
    fn create_file_and_dir_with_exact_mode() {
        let td = tempdir().unwrap();
        let file = td.path().join("f");
        let dir = td.path().join("d");

        // 0o777 would be masked to 0o755 by the usual umask.
        create_file_mode(&file, 0o777).unwrap();
        create_dir_mode(&dir, 0o777).unwrap();

        assert_eq!(mode_of(&file).unwrap(), 0o777);
        assert_eq!(mode_of(&dir).unwrap(), 0o777);
    }

    #[test]
    fn create_file_twice_is_rejected() {
        let td = tempdir().unwrap();
        let file = td.path().join("f");
        create_file_mode(&file, 0o644).unwrap();
        match create_file_mode(&file, 0o644) {
            Err(FsOpError::Path { op, source, .. }) => {
                assert_eq!(op, "open");
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
            }
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[test]
    fn zero_mode_dir_is_created() {
        let td = tempdir().unwrap();
        let dir = td.path().join("locked");
        create_dir_mode(&dir, 0).unwrap();
        assert_eq!(mode_of(&dir).unwrap(), 0);
        set_mode(&dir, 0o700).unwrap();
    }
}
