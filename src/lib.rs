//! Record/replay conformance harness for filesystem permission behavior.
//!
//! A probe is swept over one entry per (test identity, permission mode),
//! its errors are normalized into a portable form, and the result is either
//! captured into a write-once golden file or compared against it.

#[cfg(not(unix))]
compile_error!("permMatrix needs a Unix target: it relies on POSIX permission bits and identities");

pub mod config;
pub mod errors;
pub mod fs_op;
pub mod identity;
pub mod logging;
pub mod perm;

pub use crate::config::HarnessConfig;
pub use crate::errors::HarnessError;
pub use crate::fs_op::{FsOpError, OsFs, PermFs};
pub use crate::identity::{IdentitySwitch, ProcessIdentity, TestIdentity, Unswitched};
pub use crate::perm::{
    CanonicalError, ComparisonPolicy, GoldenStore, PermSweep, ProbeCtx, SweepMode, SweepOptions,
    SweepReport,
};
