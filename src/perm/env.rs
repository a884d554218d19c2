//! Permission fixture: one entry per identity and per nine-bit mode.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::errors::HarnessError;
use crate::fs_op::{FsOpError, PermFs};
use crate::identity::{IdentitySwitch, TestIdentity};

/// Number of distinct nine-bit permission values.
pub const MODE_COUNT: u32 = 512;

/// Mode the identity directory is left at once its entries exist.
pub const IDENTITY_DIR_MODE: u32 = 0o775;

/// Entry key and relative path: `"<identity>/<mode:04o>"`.
pub fn entry_key(identity: &str, mode: u32) -> String {
    format!("{identity}/{mode:04o}")
}

/// One materialized permission entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermEntry {
    pub identity: String,
    pub mode: u32,
    pub path: PathBuf,
}

impl PermEntry {
    pub fn key(&self) -> String {
        entry_key(&self.identity, self.mode)
    }
}

/// The full permission fixture under one root directory.
#[derive(Debug)]
pub struct PermEnv {
    root: PathBuf,
    entries: Vec<PermEntry>,
}

impl PermEnv {
    /// Create `<root>/<identity>/<mode>` for every identity and mode.
    ///
    /// Entries are files when `create_files` is set, directories otherwise,
    /// each with exactly its mode. When `switch` is privileged the entries
    /// are handed to their identity; otherwise they stay with the running
    /// process and permission-dependent results are implementation-defined.
    ///
    /// Identity names must be unique single path components. If building
    /// fails partway, every identity directory created so far is removed.
    pub fn build(
        fs: &dyn PermFs,
        switch: &dyn IdentitySwitch,
        root: &Path,
        identities: &[TestIdentity],
        create_files: bool,
    ) -> Result<Self, HarnessError> {
        check_identity_names(identities)?;

        let privileged = switch.is_privileged();
        if !privileged {
            tracing::warn!(
                "building permission fixture without privilege; entries stay owned by the current user"
            );
        }
        tracing::debug!(
            "building permission fixture under {} (umask {:04o})",
            root.display(),
            fs.umask()
        );

        let mut entries = Vec::with_capacity(identities.len() * MODE_COUNT as usize);
        let mut created = Vec::new();
        for id in identities {
            let built = populate(fs, privileged, root, id, create_files, &mut entries, &mut created);
            if let Err(e) = built {
                for dir in created.iter().rev() {
                    if let Err(cleanup) = fs.remove_all(dir) {
                        tracing::error!(
                            "failed to remove partial fixture {}: {}",
                            dir.display(),
                            cleanup
                        );
                    }
                }
                return Err(e.into());
            }
            tracing::debug!("materialized {} entries for {}", MODE_COUNT, id.name);
        }

        Ok(PermEnv {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Entries grouped by identity, modes ascending.
    pub fn entries(&self) -> &[PermEntry] {
        &self.entries
    }

    /// Remove every identity directory created by `build`.
    pub fn teardown(&self, fs: &dyn PermFs) -> Result<(), FsOpError> {
        let mut dirs: Vec<&str> = self.entries.iter().map(|e| e.identity.as_str()).collect();
        dirs.dedup();
        for name in dirs {
            fs.remove_all(&self.root.join(name))?;
        }
        Ok(())
    }
}

fn check_identity_names(identities: &[TestIdentity]) -> Result<(), HarnessError> {
    let mut seen = HashSet::new();
    for id in identities {
        let mut parts = Path::new(&id.name).components();
        let single = matches!(
            (parts.next(), parts.next()),
            (Some(Component::Normal(part)), None) if part == id.name.as_str()
        );
        if !single {
            return Err(HarnessError::InvalidIdentityName(id.name.clone()));
        }
        if !seen.insert(id.name.as_str()) {
            return Err(HarnessError::DuplicateIdentity(id.name.clone()));
        }
    }
    Ok(())
}

// Only directories this call created are pushed to `created`.
fn populate(
    fs: &dyn PermFs,
    privileged: bool,
    root: &Path,
    id: &TestIdentity,
    create_files: bool,
    entries: &mut Vec<PermEntry>,
    created: &mut Vec<PathBuf>,
) -> Result<(), FsOpError> {
    let dir = root.join(&id.name);
    fs.create_dir(&dir, 0o700)?;
    created.push(dir.clone());
    if privileged {
        fs.chown(&dir, id.uid, id.gid)?;
    }
    for mode in 0..MODE_COUNT {
        let path = dir.join(format!("{mode:04o}"));
        if create_files {
            fs.create_file(&path, mode)?;
        } else {
            fs.create_dir(&path, mode)?;
        }
        if privileged {
            fs.chown(&path, id.uid, id.gid)?;
        }
        entries.push(PermEntry {
            identity: id.name.clone(),
            mode,
            path,
        });
    }
    fs.chmod(&dir, IDENTITY_DIR_MODE)
}
