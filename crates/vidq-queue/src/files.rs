//! Lookup of finished files by name.

use std::path::{Path, PathBuf};

/// Returns `name` if it is a plain base name that cannot escape a directory.
///
/// Rejects empty names, `.`/`..` and anything containing a path separator
/// or a `..` sequence.
#[must_use]
pub fn safe_file_name(name: &str) -> Option<&str> {
    if name.is_empty() || name == "." || name.contains("..") {
        return None;
    }
    if name.contains(['/', '\\']) {
        return None;
    }
    Some(name)
}

/// Resolves `name` inside `dir`, if it is safe and names an existing file.
#[must_use]
pub fn locate_download(dir: &Path, name: &str) -> Option<PathBuf> {
    let name = safe_file_name(name)?;
    let path = dir.join(name);
    path.is_file().then_some(path)
}
