//! Mapping of untrusted archive entry names onto extraction destinations.
//!
//! [`secure_join`] is the only way the crate derives an on-disk path from an
//! archive entry name. Every adapter and the decompression orchestrator route
//! destination paths through it.
//!
//! # Rejected names
//!
//! | Construct | Example |
//! |-----------|---------|
//! | NUL byte | `"a\0b"` |
//! | UNC prefix | `"//server/share"`, `"\\\\server\\share"` |
//! | Traversal | `".."`, `"../x"`, `"a/../../x"` |
//! | Absolute | `"/etc/passwd"` |
//! | Drive designator | `"C:\\Windows"`, `"c:evil"` |
//! | Empty after cleaning | `""`, `"."`, `"a/.."` |
//! | Oversized | names longer than 32 KiB |
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use arcwalk::sanitize::secure_join;
//!
//! let out = Path::new("/tmp/out");
//! let dest = secure_join(out, "docs/readme.txt").unwrap();
//! assert!(dest.ends_with("docs/readme.txt"));
//!
//! assert!(secure_join(out, "../../etc/passwd").is_err());
//! ```

use std::path::{Component, Path, PathBuf};

use crate::archive_path::{MAX_PATH_LENGTH, clean};
use crate::{Error, Result};

/// Maps `entry` onto a path strictly beneath `base`.
///
/// `base` is made absolute (relative to the current directory) without
/// touching the filesystem. The returned path always has `base` as a prefix
/// and is never equal to it.
///
/// # Errors
///
/// Returns [`Error::IllegalPath`] carrying `entry` for any name that cannot
/// be placed under `base`, and [`Error::Io`] if the current directory cannot
/// be determined while absolutizing a relative `base`.
pub fn secure_join(base: &Path, entry: &str) -> Result<PathBuf> {
    let illegal = || Error::illegal_path(entry);

    if entry.contains('\0') || entry.len() > MAX_PATH_LENGTH {
        return Err(illegal());
    }

    let slashed = entry.replace('\\', "/");
    if slashed.starts_with("//") {
        return Err(illegal());
    }

    let cleaned = clean(&slashed);
    if cleaned == "." || cleaned == ".." || cleaned.starts_with("../") {
        return Err(illegal());
    }
    if cleaned.starts_with('/') {
        return Err(illegal());
    }
    if has_drive_designator(&cleaned) {
        return Err(illegal());
    }

    let relative = to_host(&cleaned);
    if relative.is_absolute() || relative.has_root() {
        return Err(illegal());
    }
    if relative
        .components()
        .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(illegal());
    }

    let abs_base = std::path::absolute(base)?;
    let joined = abs_base.join(&relative);

    let rel = joined.strip_prefix(&abs_base).map_err(|_| illegal())?;
    match rel.components().next() {
        None | Some(Component::ParentDir) => Err(illegal()),
        Some(_) => Ok(joined),
    }
}

/// Returns true when `path` begins with a `X:` drive designator.
fn has_drive_designator(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Converts a cleaned slash path into the host representation.
fn to_host(cleaned: &str) -> PathBuf {
    cleaned.split('/').collect()
}
