//! Field-by-field comparison of canonical errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::perm::normalize::CanonicalError;

/// Which fields a comparison may ignore. The message is always compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonPolicy {
    pub ignore_operation_name: bool,
    pub ignore_path_fields: bool,
}

/// One differing aspect of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Different variants; no field comparison follows.
    Kind {
        expected: &'static str,
        observed: &'static str,
    },
    Field {
        field: &'static str,
        expected: String,
        observed: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Kind { expected, observed } => {
                write!(f, "kind: expected {expected}, observed {observed}")
            }
            Finding::Field {
                field,
                expected,
                observed,
            } => write!(f, "{field}: expected {expected:?}, observed {observed:?}"),
        }
    }
}

/// Every finding for a single entry, rendered as one multi-line block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: CanonicalError,
    pub observed: CanonicalError,
    pub findings: Vec<Finding>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "expected: {:?}", self.expected)?;
        write!(f, "observed: {:?}", self.observed)?;
        for finding in &self.findings {
            write!(f, "\n  - {finding}")?;
        }
        Ok(())
    }
}

/// Compare `observed` against `expected` under `policy`.
pub fn compare(
    expected: &CanonicalError,
    observed: &CanonicalError,
    policy: ComparisonPolicy,
) -> Result<(), Mismatch> {
    let mut findings = Vec::new();
    let mut field = |name: &'static str, exp: &str, obs: &str| {
        if exp != obs {
            findings.push(Finding::Field {
                field: name,
                expected: exp.to_string(),
                observed: obs.to_string(),
            });
        }
    };

    match (expected, observed) {
        (CanonicalError::None, CanonicalError::None) => {}
        (
            CanonicalError::PathLike {
                op: e_op,
                path: e_path,
                message: e_msg,
            },
            CanonicalError::PathLike {
                op: o_op,
                path: o_path,
                message: o_msg,
            },
        ) => {
            if !policy.ignore_operation_name {
                field("operation", e_op, o_op);
            }
            if !policy.ignore_path_fields {
                field("path", e_path, o_path);
            }
            field("message", e_msg, o_msg);
        }
        (
            CanonicalError::LinkLike {
                op: e_op,
                old_path: e_old,
                new_path: e_new,
                message: e_msg,
            },
            CanonicalError::LinkLike {
                op: o_op,
                old_path: o_old,
                new_path: o_new,
                message: o_msg,
            },
        ) => {
            if !policy.ignore_operation_name {
                field("operation", e_op, o_op);
            }
            if !policy.ignore_path_fields {
                field("old-path", e_old, o_old);
                field("new-path", e_new, o_new);
            }
            field("message", e_msg, o_msg);
        }
        (CanonicalError::Opaque { message: e_msg }, CanonicalError::Opaque { message: o_msg }) => {
            field("message", e_msg, o_msg);
        }
        _ => {
            return Err(Mismatch {
                expected: expected.clone(),
                observed: observed.clone(),
                findings: vec![Finding::Kind {
                    expected: expected.kind(),
                    observed: observed.kind(),
                }],
            })
        }
    }

    if findings.is_empty() {
        Ok(())
    } else {
        Err(Mismatch {
            expected: expected.clone(),
            observed: observed.clone(),
            findings,
        })
    }
}
