//! Reduce probe results to a canonical, portable error descriptor.

use std::io;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::fs_op::FsOpError;

/// One of the four error shapes a probe can produce, with every path made
/// relative to the permission root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CanonicalError {
    None,
    PathLike {
        #[serde(rename = "operation")]
        op: String,
        path: String,
        message: String,
    },
    LinkLike {
        #[serde(rename = "operation")]
        op: String,
        #[serde(rename = "old-path")]
        old_path: String,
        #[serde(rename = "new-path")]
        new_path: String,
        message: String,
    },
    Opaque {
        message: String,
    },
}

impl CanonicalError {
    /// Name used for the variant in golden files and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            CanonicalError::None => "none",
            CanonicalError::PathLike { .. } => "path-like",
            CanonicalError::LinkLike { .. } => "link-like",
            CanonicalError::Opaque { .. } => "opaque",
        }
    }
}

/// Normalize one probe result against the permission `root`.
pub fn normalize(root: &Path, result: &Result<(), FsOpError>) -> CanonicalError {
    match result {
        Ok(()) => CanonicalError::None,
        Err(err) => normalize_error(root, err),
    }
}

/// Normalize a probe error against the permission `root`.
pub fn normalize_error(root: &Path, err: &FsOpError) -> CanonicalError {
    match err {
        FsOpError::Path { op, path, source } => CanonicalError::PathLike {
            op: op.clone(),
            path: relative_to(root, path),
            message: strip_root(root, &cause_message(source)),
        },
        FsOpError::Link {
            op,
            old,
            new,
            source,
        } => CanonicalError::LinkLike {
            op: op.clone(),
            old_path: relative_to(root, old),
            new_path: relative_to(root, new),
            message: strip_root(root, &cause_message(source)),
        },
        FsOpError::Io(source) => CanonicalError::Opaque {
            message: strip_root(root, &cause_message(source)),
        },
        FsOpError::Message(msg) => CanonicalError::Opaque {
            message: strip_root(root, msg),
        },
    }
}

/// Render `path` relative to `root` with `/` separators.
///
/// Paths outside `root` are kept whole; `root` itself becomes `"."`.
pub fn relative_to(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => {
            let parts: Vec<String> = rel
                .components()
                .filter_map(|c| match c {
                    Component::CurDir => None,
                    other => Some(other.as_os_str().to_string_lossy().into_owned()),
                })
                .collect();
            if parts.is_empty() {
                ".".to_string()
            } else {
                parts.join("/")
            }
        }
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Platform-neutral text for an IO error.
///
/// OS errors become the lower-cased `strerror` text without Rust's
/// `(os error N)` suffix, e.g. `"permission denied"`.
pub fn cause_message(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(code) => {
            let text = io::Error::from_raw_os_error(code).to_string();
            let text = match text.rfind(" (os error ") {
                Some(idx) => &text[..idx],
                None => text.as_str(),
            };
            lower_first(text)
        }
        None => err.to_string(),
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Remove every occurrence of `root` from `message`: `<root>/x` becomes `x`
/// and a bare `<root>` becomes `.`. Occurrences that continue into a longer
/// name (`<root>4/x`) are left alone.
fn strip_root(root: &Path, message: &str) -> String {
    let root = root.to_string_lossy();
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return message.to_string();
    }
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(idx) = rest.find(root) {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + root.len()..];
        if let Some(tail) = after.strip_prefix('/') {
            rest = tail;
        } else if after.chars().next().map_or(true, |c| !continues_name(c)) {
            out.push('.');
            rest = after;
        } else {
            out.push_str(root);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

fn continues_name(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '_' | '-')
}
