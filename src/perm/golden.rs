//! Write-once golden files holding a probe's expected behavior.
//!
//! A baseline is stored per (probe, operating system) as
//! `<dir>/<probe>_<os>.json`: a JSON object keyed by `"<identity>/<mode>"`
//! with keys in sorted order. A baseline that exists is only ever read; to
//! recapture, delete the file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::HarnessError;
use crate::fs_op::helpers::atomic_write_new;
use crate::perm::normalize::CanonicalError;

/// Expected or captured results keyed by entry key.
pub type Baseline = BTreeMap<String, CanonicalError>;

/// Whether a sweep records a new baseline or checks against an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    Capturing,
    Replaying,
}

/// Golden file for one (probe, OS) pair.
#[derive(Debug)]
pub struct GoldenStore {
    path: PathBuf,
    existed: bool,
    baseline: Baseline,
}

impl GoldenStore {
    /// Load the golden file for `probe` on `os` from `dir`.
    ///
    /// A missing file is not an error: the store starts empty in capture
    /// mode. An existing file that cannot be read or parsed is fatal.
    pub fn load(dir: &Path, probe: &str, os: &str) -> Result<Self, HarnessError> {
        if !valid_name(probe, true) {
            return Err(HarnessError::InvalidProbeName(probe.to_string()));
        }
        // `_` separates probe from OS, so only the probe may contain it.
        if !valid_name(os, false) {
            return Err(HarnessError::InvalidOsName(os.to_string()));
        }
        let path = dir.join(format!("{probe}_{os}.json"));
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("no baseline at {}, capturing", path.display());
                return Ok(GoldenStore {
                    path,
                    existed: false,
                    baseline: Baseline::new(),
                });
            }
            Err(source) => return Err(HarnessError::BaselineRead { path, source }),
        };
        let baseline = serde_json::from_slice(&bytes)
            .map_err(|source| HarnessError::MalformedBaseline {
                path: path.clone(),
                source,
            })?;
        Ok(GoldenStore {
            path,
            existed: true,
            baseline,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn existed(&self) -> bool {
        self.existed
    }

    pub fn mode(&self) -> SweepMode {
        if self.existed {
            SweepMode::Replaying
        } else {
            SweepMode::Capturing
        }
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn expected(&self, key: &str) -> Option<&CanonicalError> {
        self.baseline.get(key)
    }

    /// Record a result while capturing.
    pub fn record(&mut self, key: String, observed: CanonicalError) {
        self.baseline.insert(key, observed);
    }

    /// Persist a newly captured baseline. No-op when the file existed at load.
    pub fn save(&self) -> Result<(), HarnessError> {
        if self.existed {
            tracing::debug!("baseline {} already exists, not rewriting", self.path.display());
            return Ok(());
        }
        let bytes = to_golden_bytes(&self.baseline)?;
        atomic_write_new(&self.path, &bytes).map_err(|source| HarnessError::BaselineWrite {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(
            "captured {} entries into {}",
            self.baseline.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Serialize a baseline the way golden files store it: sorted keys,
/// two-space indentation, trailing newline.
pub fn to_golden_bytes(baseline: &Baseline) -> Result<Vec<u8>, HarnessError> {
    let mut bytes = serde_json::to_vec_pretty(baseline).map_err(HarnessError::Serialize)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn valid_name(name: &str, allow_underscore: bool) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || (allow_underscore && c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Baseline {
        let mut b = Baseline::new();
        b.insert("bob/0000".into(), CanonicalError::None);
        b.insert(
            "alice/0644".into(),
            CanonicalError::PathLike {
                op: "chmod".into(),
                path: "alice/0644".into(),
                message: "permission denied".into(),
            },
        );
        b.insert(
            "alice/0000".into(),
            CanonicalError::LinkLike {
                op: "rename".into(),
                old_path: "alice/0000".into(),
                new_path: "alice/0000.new".into(),
                message: "operation not permitted".into(),
            },
        );
        b.insert(
            "bob/0001".into(),
            CanonicalError::Opaque {
                message: "boom".into(),
            },
        );
        b
    }

    #[test]
    fn missing_file_means_capture() {
        let dir = tempdir().unwrap();
        let store = GoldenStore::load(dir.path(), "stat", "linux").unwrap();
        assert!(!store.existed());
        assert_eq!(store.mode(), SweepMode::Capturing);
        assert!(store.baseline().is_empty());
        assert_eq!(store.path(), dir.path().join("stat_linux.json"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut store = GoldenStore::load(dir.path(), "chmod", "linux").unwrap();
        for (k, v) in sample() {
            store.record(k, v);
        }
        store.save().unwrap();

        let loaded = GoldenStore::load(dir.path(), "chmod", "linux").unwrap();
        assert!(loaded.existed());
        assert_eq!(loaded.mode(), SweepMode::Replaying);
        assert_eq!(loaded.baseline(), &sample());
    }

    #[test]
    fn existing_baseline_is_never_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stat_linux.json");
        let original = to_golden_bytes(&sample()).unwrap();
        fs::write(&path, &original).unwrap();

        let mut store = GoldenStore::load(dir.path(), "stat", "linux").unwrap();
        store.record("carol/0777".into(), CanonicalError::None);
        store.save().unwrap();
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn baseline_appearing_after_load_is_not_clobbered() {
        let dir = tempdir().unwrap();
        let mut store = GoldenStore::load(dir.path(), "stat", "linux").unwrap();
        store.record("alice/0000".into(), CanonicalError::None);
        fs::write(dir.path().join("stat_linux.json"), b"{}\n").unwrap();
        match store.save() {
            Err(HarnessError::BaselineWrite { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::AlreadyExists)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fs::read(dir.path().join("stat_linux.json")).unwrap(), b"{}\n");
    }

    #[test]
    fn malformed_baseline_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("stat_linux.json"), b"{ not json").unwrap();
        assert!(matches!(
            GoldenStore::load(dir.path(), "stat", "linux"),
            Err(HarnessError::MalformedBaseline { .. })
        ));

        fs::write(
            dir.path().join("open_linux.json"),
            br#"{"alice/0000": {"kind": "sideways"}}"#,
        )
        .unwrap();
        assert!(matches!(
            GoldenStore::load(dir.path(), "open", "linux"),
            Err(HarnessError::MalformedBaseline { .. })
        ));
    }

    #[test]
    fn probe_names_are_validated() {
        let dir = tempdir().unwrap();
        for bad in ["", "../escape", "with space", "dot.name"] {
            assert!(matches!(
                GoldenStore::load(dir.path(), bad, "linux"),
                Err(HarnessError::InvalidProbeName(_))
            ));
        }
        assert!(GoldenStore::load(dir.path(), "open-read_as_bob", "linux").is_ok());
    }

    #[test]
    fn os_names_cannot_contain_the_separator() {
        let dir = tempdir().unwrap();
        for bad in ["", "b_c", "mac os", "../linux"] {
            match GoldenStore::load(dir.path(), "a", bad) {
                Err(HarnessError::InvalidOsName(name)) => assert_eq!(name, bad),
                other => panic!("unexpected {other:?}"),
            }
        }
        let store = GoldenStore::load(dir.path(), "a_b", "c").unwrap();
        assert_eq!(store.path(), dir.path().join("a_b_c.json"));
        assert!(GoldenStore::load(dir.path(), "stat", std::env::consts::OS).is_ok());
    }

    #[test]
    fn keys_are_written_in_sorted_order() {
        let bytes = to_golden_bytes(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let a0 = text.find("\"alice/0000\"").unwrap();
        let a644 = text.find("\"alice/0644\"").unwrap();
        let b0 = text.find("\"bob/0000\"").unwrap();
        assert!(a0 < a644 && a644 < b0);
        assert!(text.ends_with("}\n"));
    }
}
