//! Drive a probe across every (identity, mode) entry and either capture a
//! baseline or check the probe against one.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::errors::HarnessError;
use crate::fs_op::{FsOpError, PermFs};
use crate::identity::{assume, IdentitySwitch, TestIdentity};
use crate::perm::compare::{compare, ComparisonPolicy, Mismatch};
use crate::perm::env::{PermEntry, PermEnv};
use crate::perm::golden::{GoldenStore, SweepMode};
use crate::perm::normalize::normalize;

/// Everything a probe learns about the entry it is run against.
#[derive(Debug, Clone, Copy)]
pub struct ProbeCtx<'a> {
    /// Permission root; stripped from every recorded path.
    pub root: &'a Path,
    /// The entry under test.
    pub path: &'a Path,
    /// Identity owning the entry.
    pub owner: &'a TestIdentity,
    /// Permission bits of the entry.
    pub mode: u32,
    /// Identity the probe runs as, `None` for the process itself.
    pub actor: Option<&'a TestIdentity>,
}

/// Per-sweep settings.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub golden_dir: PathBuf,
    /// Materialize files instead of directories.
    pub create_files: bool,
    pub policy: ComparisonPolicy,
    /// Name of the operating system the baseline belongs to.
    pub os: String,
}

impl SweepOptions {
    pub fn new(golden_dir: impl Into<PathBuf>) -> Self {
        SweepOptions {
            golden_dir: golden_dir.into(),
            create_files: false,
            policy: ComparisonPolicy::default(),
            os: std::env::consts::OS.to_string(),
        }
    }

    pub fn create_files(mut self, yes: bool) -> Self {
        self.create_files = yes;
        self
    }

    pub fn policy(mut self, policy: ComparisonPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }
}

/// A diverging entry found while replaying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMismatch {
    pub key: String,
    pub mismatch: Mismatch,
}

/// Outcome of one sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub probe: String,
    pub mode: SweepMode,
    pub golden: PathBuf,
    /// Number of entries probed.
    pub entries: usize,
    pub mismatches: Vec<EntryMismatch>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Every mismatch as one text block per entry.
    pub fn details(&self) -> String {
        let mut out = String::new();
        for m in &self.mismatches {
            let _ = writeln!(out, "[{}]", m.key);
            for line in m.mismatch.to_string().lines() {
                let _ = writeln!(out, "  {line}");
            }
        }
        out
    }

    pub fn into_result(self) -> Result<Self, HarnessError> {
        if self.is_clean() {
            return Ok(self);
        }
        Err(HarnessError::Mismatches {
            count: self.mismatches.len(),
            details: self.details(),
            probe: self.probe,
        })
    }

    /// Panic with every diagnostic if any entry diverged.
    #[track_caller]
    pub fn assert_clean(&self) {
        if !self.is_clean() {
            panic!(
                "{} permission entries diverge from {}:\n{}",
                self.mismatches.len(),
                self.golden.display(),
                self.details()
            );
        }
    }
}

/// Sequential permission sweep over a fixed set of identities.
pub struct PermSweep<'a> {
    fs: &'a dyn PermFs,
    switch: &'a dyn IdentitySwitch,
    identities: Vec<TestIdentity>,
    options: SweepOptions,
    actor: Option<TestIdentity>,
}

impl<'a> PermSweep<'a> {
    pub fn new(
        fs: &'a dyn PermFs,
        switch: &'a dyn IdentitySwitch,
        identities: Vec<TestIdentity>,
        options: SweepOptions,
    ) -> Self {
        PermSweep {
            fs,
            switch,
            identities,
            options,
            actor: None,
        }
    }

    /// Run every probe as `actor` instead of the process identity.
    pub fn acting_as(mut self, actor: TestIdentity) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn identities(&self) -> &[TestIdentity] {
        &self.identities
    }

    /// Build the fixture under `root`, run `probe` on every entry, then
    /// capture or replay against the `probe_name` baseline.
    ///
    /// Fixture, baseline and identity failures, as well as a drifted probe
    /// matrix, abort the sweep. Mismatching entries do not; they are
    /// collected in the returned report.
    pub fn run<F>(
        &self,
        root: &Path,
        probe_name: &str,
        mut probe: F,
    ) -> Result<SweepReport, HarnessError>
    where
        F: FnMut(&ProbeCtx<'_>) -> Result<(), FsOpError>,
    {
        let mut store = GoldenStore::load(&self.options.golden_dir, probe_name, &self.options.os)?;
        let mode = store.mode();
        tracing::info!(
            "sweeping `{}` over {} identities ({:?})",
            probe_name,
            self.identities.len(),
            mode
        );

        let env = PermEnv::build(
            self.fs,
            self.switch,
            root,
            &self.identities,
            self.options.create_files,
        )?;

        let outcome = self.sweep(&env, &mut store, mode, &mut probe);
        let teardown = env.teardown(self.fs);
        let mismatches = outcome?;
        teardown?;

        if mode == SweepMode::Replaying {
            let visited: HashSet<String> = env.entries().iter().map(PermEntry::key).collect();
            let extra: Vec<String> = store
                .baseline()
                .keys()
                .filter(|k| !visited.contains(*k))
                .cloned()
                .collect();
            if !extra.is_empty() {
                return Err(HarnessError::UnexpectedBaselineKeys {
                    golden: store.path().to_path_buf(),
                    keys: extra,
                });
            }
        }

        store.save()?;

        tracing::info!(
            "`{}`: {} entries, {} mismatches",
            probe_name,
            env.entries().len(),
            mismatches.len()
        );
        Ok(SweepReport {
            probe: probe_name.to_string(),
            mode,
            golden: store.path().to_path_buf(),
            entries: env.entries().len(),
            mismatches,
        })
    }

    fn sweep<F>(
        &self,
        env: &PermEnv,
        store: &mut GoldenStore,
        mode: SweepMode,
        probe: &mut F,
    ) -> Result<Vec<EntryMismatch>, HarnessError>
    where
        F: FnMut(&ProbeCtx<'_>) -> Result<(), FsOpError>,
    {
        let mut mismatches = Vec::new();
        for owner in &self.identities {
            tracing::debug!("probing entries of {}", owner.name);
            for entry in env.entries().iter().filter(|e| e.identity == owner.name) {
                let ctx = ProbeCtx {
                    root: env.root(),
                    path: &entry.path,
                    owner,
                    mode: entry.mode,
                    actor: self.actor.as_ref(),
                };
                let result = match self.actor.as_ref() {
                    Some(actor) => {
                        let _as = assume(self.switch, actor)?;
                        probe(&ctx)
                    }
                    None => probe(&ctx),
                };
                let observed = normalize(env.root(), &result);
                let key = entry.key();

                match mode {
                    SweepMode::Capturing => store.record(key, observed),
                    SweepMode::Replaying => {
                        let expected = store.expected(&key).ok_or_else(|| {
                            HarnessError::MissingBaselineEntry {
                                key: key.clone(),
                                golden: store.path().to_path_buf(),
                            }
                        })?;
                        if let Err(mismatch) = compare(expected, &observed, self.options.policy)
                        {
                            tracing::warn!("{key} diverges from baseline:\n{mismatch}");
                            mismatches.push(EntryMismatch { key, mismatch });
                        }
                    }
                }
            }
        }
        Ok(mismatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_op::OsFs;
    use crate::identity::Unswitched;
    use crate::perm::normalize::CanonicalError;
    use std::io;
    use tempfile::tempdir;

    // Denies anything without the owner-write bit, independent of who runs it.
    fn owner_write_probe(ctx: &ProbeCtx<'_>) -> Result<(), FsOpError> {
        if ctx.mode & 0o200 == 0 {
            Err(FsOpError::path(
                "chmod",
                ctx.path,
                io::Error::from_raw_os_error(libc::EACCES),
            ))
        } else {
            Ok(())
        }
    }

    fn ids() -> Vec<TestIdentity> {
        vec![TestIdentity::current("alice"), TestIdentity::current("bob")]
    }

    #[test]
    fn capture_records_every_entry_then_replays_clean() {
        let golden = tempdir().unwrap();
        let root = tempdir().unwrap();
        let sweep = PermSweep::new(&OsFs, &Unswitched, ids(), SweepOptions::new(golden.path()));

        let first = sweep.run(root.path(), "chmod", owner_write_probe).unwrap();
        assert_eq!(first.mode, SweepMode::Capturing);
        assert_eq!(first.entries, 1024);
        assert!(first.is_clean());

        let store = GoldenStore::load(golden.path(), "chmod", std::env::consts::OS).unwrap();
        assert_eq!(store.baseline().len(), 1024);
        assert_eq!(
            store.expected("alice/0444"),
            Some(&CanonicalError::PathLike {
                op: "chmod".into(),
                path: "alice/0444".into(),
                message: "permission denied".into(),
            })
        );
        assert_eq!(store.expected("bob/0644"), Some(&CanonicalError::None));

        let second = sweep.run(root.path(), "chmod", owner_write_probe).unwrap();
        assert_eq!(second.mode, SweepMode::Replaying);
        second.assert_clean();
    }

    #[test]
    fn replay_collects_every_mismatch() {
        let golden = tempdir().unwrap();
        let root = tempdir().unwrap();
        let sweep = PermSweep::new(&OsFs, &Unswitched, ids(), SweepOptions::new(golden.path()));
        sweep.run(root.path(), "open", owner_write_probe).unwrap();

        // A regression: everything succeeds now.
        let report = sweep.run(root.path(), "open", |_| Ok(())).unwrap();
        assert_eq!(report.mode, SweepMode::Replaying);
        // 256 modes per identity lack owner-write.
        assert_eq!(report.mismatches.len(), 512);
        assert_eq!(report.mismatches[0].key, "alice/0000");
        assert!(report.details().contains("kind: expected path-like, observed none"));

        match report.into_result() {
            Err(HarnessError::Mismatches { count, probe, .. }) => {
                assert_eq!(count, 512);
                assert_eq!(probe, "open");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fixture_is_removed_after_sweep() {
        let golden = tempdir().unwrap();
        let root = tempdir().unwrap();
        let sweep = PermSweep::new(
            &OsFs,
            &Unswitched,
            ids(),
            SweepOptions::new(golden.path()).create_files(true),
        );
        let mut seen = 0;
        sweep
            .run(root.path(), "stat", |ctx| {
                seen += 1;
                assert!(ctx.path.is_file());
                assert!(ctx.actor.is_none());
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, 1024);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
