//! Record/replay permission differential testing.
//!
//! [`PermSweep`] materializes one entry per (identity, mode) with
//! [`PermEnv`], runs a probe against each, reduces the result to a
//! [`CanonicalError`] and either records it into a new golden file or
//! compares it with the one already on disk.

pub mod compare;
pub mod env;
pub mod golden;
pub mod normalize;
pub mod sweep;

pub use compare::{compare, ComparisonPolicy, Finding, Mismatch};
pub use env::{entry_key, PermEntry, PermEnv, MODE_COUNT};
pub use golden::{Baseline, GoldenStore, SweepMode};
pub use normalize::{normalize, CanonicalError};
pub use sweep::{EntryMismatch, PermSweep, ProbeCtx, SweepOptions, SweepReport};
