//! Root-relative path strings for pattern matching.
//!
//! Policy rules, directory priorities and protected names all match against a
//! single canonical string per file: the path relative to the scan root, with
//! `/` separators and Unicode NFC normalization. macOS reports NFD names, so
//! without normalization `café.c` could fail to match a rule written in NFC.
//!
//! # Example
//!
//! ```
//! use treetidy::scanner::path_utils::{normalize_path_str, relative_key};
//! use std::path::Path;
//!
//! assert_eq!(normalize_path_str("cafe\u{0301}.c"), "café.c");
//! assert_eq!(relative_key(Path::new("/r"), Path::new("/r/src/a.c")), "src/a.c");
//! ```

use std::path::{Component, Path};
use unicode_normalization::UnicodeNormalization;

/// Normalize a string to NFC form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Root-relative, `/`-separated, NFC-normalized key for `path`.
///
/// Paths outside `root` fall back to their full lossy representation.
#[must_use]
pub fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    normalize_path_str(&joined)
}

/// Whether `relative` lies under `prefix` on a component boundary.
///
/// A trailing `/` on the prefix is optional; an empty prefix matches everything.
#[must_use]
pub fn is_under_prefix(relative: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match relative.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
