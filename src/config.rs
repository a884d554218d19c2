//! Harness settings read from TOML.
//!
//! ```toml
//! golden_dir = "testdata/perm_golden"
//! create_files = true
//! identities = ["alice", "bob"]
//!
//! [policy]
//! ignore_path_fields = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::HarnessError;
use crate::identity::TestIdentity;
use crate::perm::{ComparisonPolicy, SweepOptions};

/// Environment variable overriding `golden_dir`.
pub const GOLDEN_DIR_ENV: &str = "PERM_MATRIX_GOLDEN_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub golden_dir: PathBuf,
    pub create_files: bool,
    /// System account names to materialize entries for.
    pub identities: Vec<String>,
    pub policy: ComparisonPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            golden_dir: default_golden_dir(),
            create_files: false,
            identities: Vec::new(),
            policy: ComparisonPolicy::default(),
        }
    }
}

/// `testdata/perm_golden` inside this crate.
pub fn default_golden_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("perm_golden")
}

impl HarnessConfig {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Read a config file. Relative `golden_dir`s resolve against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::from_toml(&text).map_err(|source| HarnessError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        if cfg.golden_dir.is_relative() {
            if let Some(base) = path.parent() {
                cfg.golden_dir = base.join(&cfg.golden_dir);
            }
        }
        Ok(cfg)
    }

    /// Apply `PERM_MATRIX_GOLDEN_DIR` if it is set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(GOLDEN_DIR_ENV).filter(|d| !d.is_empty()) {
            tracing::debug!("golden dir overridden by {GOLDEN_DIR_ENV}: {dir}");
            self.golden_dir = PathBuf::from(dir);
        }
        self
    }

    /// Resolve the configured account names.
    pub fn resolve_identities(&self) -> Result<Vec<TestIdentity>, HarnessError> {
        self.identities
            .iter()
            .map(|name| TestIdentity::lookup(name))
            .collect()
    }

    pub fn sweep_options(&self) -> SweepOptions {
        SweepOptions::new(&self.golden_dir)
            .create_files(self.create_files)
            .policy(self.policy)
    }
}
