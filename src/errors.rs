use std::path::PathBuf;

use thiserror::Error;

use crate::fs_op::FsOpError;

/// Errors that stop a permission sweep.
///
/// A probe returning an error is never one of these; only fixture setup,
/// unreadable baselines, a drifted probe matrix and (on request) collected
/// mismatches are.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Building or tearing down the permission fixture failed.
    #[error("fixture setup failed: {0}")]
    Fixture(#[from] FsOpError),

    #[error("cannot read baseline `{}`: {source}", .path.display())]
    BaselineRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An existing golden file must always parse.
    #[error("malformed baseline `{}`: {source}", .path.display())]
    MalformedBaseline {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write baseline `{}`: {source}", .path.display())]
    BaselineWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize baseline: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The sweep asked for an entry the baseline never recorded.
    #[error(
        "no baseline recorded for this entry: `{key}` is missing from `{}`; \
         delete the golden file and recapture if the probe matrix changed",
        .golden.display()
    )]
    MissingBaselineEntry { key: String, golden: PathBuf },

    /// The baseline holds entries the sweep never visited.
    #[error(
        "baseline `{}` has {} entries the sweep did not visit (first: `{}`)",
        .golden.display(),
        .keys.len(),
        .keys.first().map(String::as_str).unwrap_or("")
    )]
    UnexpectedBaselineKeys { golden: PathBuf, keys: Vec<String> },

    #[error("invalid probe name `{0}`: use only ASCII letters, digits, `_` and `-`")]
    InvalidProbeName(String),

    #[error("invalid OS name `{0}`: use only ASCII letters, digits and `-`")]
    InvalidOsName(String),

    /// Identity names become directory names and key prefixes.
    #[error("invalid test identity name `{0}`: must be a single path component")]
    InvalidIdentityName(String),

    #[error("test identity `{0}` is listed more than once")]
    DuplicateIdentity(String),

    #[error("unknown test identity `{0}`")]
    UnknownIdentity(String),

    #[error("cannot switch to identity `{name}`: {source}")]
    Identity {
        name: String,
        #[source]
        source: nix::Error,
    },

    #[error("invalid config `{}`: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot read config `{}`: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Collected comparison failures, one diagnostic block per entry.
    #[error("{count} permission entries diverge from the baseline for `{probe}`:\n{details}")]
    Mismatches {
        probe: String,
        count: usize,
        details: String,
    },
}
