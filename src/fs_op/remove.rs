use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use thiserror::Error;

/// Errors returned from filesystem remove operations in this module.
///
/// Removal of a path that does not exist is treated as success (no-op) so
/// callers can tear down fixtures without checking for existence first.
#[derive(Debug, Error)]
#[error("filesystem remove error: {0}")]
pub struct RemoveError(#[from] pub io::Error);

/// Remove the tree at `path` even when it contains unreadable directories.
///
/// Permission fixtures are full of `0o000` and `0o200` directories that
/// their owner cannot list. Every directory is reopened to `0o755` before
/// it is read, then the tree is removed.
pub fn remove_relaxed(path: impl AsRef<Path>) -> Result<(), RemoveError> {
    let p = path.as_ref();

    let meta = match fs::symlink_metadata(p) {
        Ok(m) => m,
        // Nothing to do; removal of a non-existent path is a no-op.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if meta.is_dir() {
        relax_tree(p)?;
        fs::remove_dir_all(p)?;
    } else {
        fs::remove_file(p)?;
    }

    Ok(())
}

fn relax_tree(root: &Path) -> io::Result<()> {
    fs::set_permissions(root, fs::Permissions::from_mode(0o755))?;
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            relax_tree(&entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_op::create::create_dir_mode;
    use tempfile::tempdir;

    #[test]
    fn remove_tree_with_locked_dirs() {
        let td = tempdir().expect("create temp dir");
        let root = td.path().join("fixture");
        fs::create_dir(&root).unwrap();
        let locked = root.join("0000");
        create_dir_mode(&locked, 0o700).unwrap();
        fs::write(locked.join("inner"), b"x").unwrap();
        crate::fs_op::metadata::set_mode(&locked, 0).unwrap();
        create_dir_mode(root.join("0200"), 0o200).unwrap();

        remove_relaxed(&root).expect("remove fixture");
        assert!(!root.exists(), "fixture should be removed");
    }

    #[test]
    fn remove_single_file() {
        let td = tempdir().unwrap();
        let f = td.path().join("f.txt");
        fs::write(&f, b"x").unwrap();
        remove_relaxed(&f).unwrap();
        assert!(!f.exists());
    }

    #[test]
    fn remove_nonexistent_is_ok() {
        let td = tempdir().expect("tempdir");
        let p = td.path().join("does_not_exist");
        assert!(remove_relaxed(&p).is_ok());
    }
}
