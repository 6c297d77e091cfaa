//! Helpers for sanitizing paths before they cross trust boundaries.
//!
//! Paths end up in two sensitive places: tracing span attributes (safe to
//! share for debugging) and the command line handed to the external render
//! tool. These functions keep full paths out of the former and traversal
//! sequences out of the latter.

use std::path::{Component, Path};

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields — reveals file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Checks whether a path is safe to interpolate into a render command line.
///
/// Rejects non-UTF-8 paths and any path containing a `..` component. The
/// render tool is a trust boundary; every path argument passes through here
/// before it reaches the command line, regardless of where it was built.
pub fn is_safe_argument(path: &Path) -> bool {
    if path.to_str().is_none() {
        return false;
    }
    !path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

/// Reduces a stored artifact path to the base filename clients may request.
///
/// Serving convention: artifact files are exposed from a flat static
/// directory, so any directory components in a stored path are stripped.
pub fn public_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}
