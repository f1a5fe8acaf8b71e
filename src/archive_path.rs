//! Lexical helpers for slash-separated archive paths.
//!
//! Archive formats store entry names as strings with `/` (or, for some
//! Windows-produced archives, `\`) separators. These helpers operate purely on
//! the string form and never touch the host filesystem, so they behave the
//! same on every platform.
//!
//! # Examples
//!
//! ```
//! use arcwalk::archive_path::{base, clean, dir};
//!
//! assert_eq!(clean("a/./b/../c/"), "a/c");
//! assert_eq!(dir("a/b/c.txt"), "a/b");
//! assert_eq!(base("a/b/c.txt"), "c.txt");
//! ```

/// Longest entry name, in bytes, that may be mapped onto the host.
pub(crate) const MAX_PATH_LENGTH: usize = 32768;

/// Returns the shortest lexically equivalent form of a slash-separated path.
///
/// Empty and `.` segments are dropped, `..` removes the preceding segment,
/// and a `..` that would climb above a rooted path is discarded. A relative
/// path that climbs above its start keeps its leading `..` segments. The
/// empty path cleans to `"."`.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Returns all but the last element of `path`, cleaned.
///
/// A path without any separator has the directory `"."`.
pub fn dir(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => clean(&path[..=pos]),
        None => ".".to_string(),
    }
}

/// Returns the last element of `path`, ignoring trailing separators.
///
/// The empty path yields `"."` and a path of only separators yields `"/"`.
pub fn base(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Converts backslash separators to forward slashes.
pub fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Normalizes a caller-supplied inner path.
///
/// Separators are unified, the path is cleaned and the leading `/` is
/// removed. The archive root (`"/"`, `""` or `"."`) normalizes to the empty
/// string.
///
/// # Examples
///
/// ```
/// use arcwalk::archive_path::normalize_inner;
///
/// assert_eq!(normalize_inner("/"), "");
/// assert_eq!(normalize_inner("/docs/readme.txt"), "docs/readme.txt");
/// assert_eq!(normalize_inner("docs\\sub\\"), "docs/sub");
/// ```
pub fn normalize_inner(inner: &str) -> String {
    let cleaned = clean(&format!("/{}", to_slash(inner)));
    cleaned.trim_start_matches('/').to_string()
}

/// Returns true when a normalized inner path addresses the archive root.
pub fn is_root(normalized: &str) -> bool {
    normalized.is_empty()
}

/// Normalizes an entry name as stored in an archive for indexing.
///
/// Unlike [`normalize_inner`], `..` segments that climb above the root are
/// preserved so hostile names stay visible to listing and are rejected later
/// by the sanitizer. Trailing separators are dropped.
pub(crate) fn normalize_entry(name: &str) -> String {
    let slashed = to_slash(name);
    let trimmed = slashed.trim_start_matches('/');
    let cleaned = clean(trimmed);
    if cleaned == "." {
        String::new()
    } else {
        cleaned
    }
}
