//! Filesystem-style view over a generic container.
//!
//! [`ArchiveFs`] indexes entry metadata (never payloads) so that directory
//! listing and path lookup work the same for zip, tar and single compressed
//! files. Directories that the archive never lists explicitly are inferred
//! from file paths.
//!
//! # Path Handling
//!
//! Paths use forward slashes (`/`) as separators, regardless of the platform.
//! Leading separators are ignored and the root is the empty string.

use std::collections::HashMap;
use std::time::SystemTime;

use super::entries::{self, RawEntry, Scan};
use super::kind::{self, ContainerKind};
use crate::archive_path::normalize_entry;
use crate::decompress::EntryKind;
use crate::model::Object;
use crate::source::ArchiveSource;
use crate::{Error, Result};

/// Indexed metadata for one path.
#[derive(Debug, Clone)]
pub(crate) struct FsEntry {
    /// Normalized path, never empty.
    pub path: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub kind: EntryKind,
    /// Position in the archive's entry sequence; `None` for inferred
    /// directories.
    pub ordinal: Option<usize>,
}

impl FsEntry {
    fn implicit_dir(path: String) -> Self {
        Self {
            path,
            size: 0,
            modified: None,
            kind: EntryKind::Dir,
            ordinal: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    fn to_object(&self) -> Object {
        Object {
            name: file_name(&self.path),
            size: if self.is_dir() { 0 } else { self.size },
            modified: self.modified,
            is_folder: self.is_dir(),
        }
    }
}

/// Directory view over a container's entries.
#[derive(Debug)]
pub(crate) struct ArchiveFs {
    kind: ContainerKind,
    entries: Vec<FsEntry>,
    /// Path index for fast lookups
    path_index: HashMap<String, usize>,
    /// Directory tree (path -> child names in first-seen order)
    dir_tree: HashMap<String, Vec<String>>,
    comment: String,
    encrypted: bool,
}

impl ArchiveFs {
    /// Detects the container kind of `source` and indexes its entries.
    pub fn open(source: &mut ArchiveSource) -> Result<Self> {
        let kind = kind::detect(source)?;
        let scan = entries::scan(kind, source)?;
        Self::from_scan(kind, scan)
    }

    fn from_scan(kind: ContainerKind, scan: Scan) -> Result<Self> {
        let mut fs = Self {
            kind,
            entries: Vec::with_capacity(scan.entries.len()),
            path_index: HashMap::new(),
            dir_tree: HashMap::new(),
            comment: scan.comment,
            encrypted: false,
        };
        fs.dir_tree.insert(String::new(), Vec::new());

        for (ordinal, raw) in scan.entries.into_iter().enumerate() {
            fs.insert(ordinal, raw)?;
        }
        Ok(fs)
    }

    fn insert(&mut self, ordinal: usize, raw: RawEntry) -> Result<()> {
        if raw.name.contains('\0') {
            return Err(Error::illegal_path(raw.name));
        }
        self.encrypted |= raw.encrypted;

        let path = normalize_entry(&raw.name);
        if path.is_empty() {
            return Ok(());
        }
        let entry = FsEntry {
            path: path.clone(),
            size: raw.size,
            modified: raw.modified,
            kind: raw.kind,
            ordinal: Some(ordinal),
        };

        // Later entries with the same path replace earlier ones, except that
        // a directory with children stays a directory.
        if let Some(&idx) = self.path_index.get(&path) {
            let has_children = self.dir_tree.get(&path).is_some_and(|c| !c.is_empty());
            if has_children && !entry.is_dir() {
                log::warn!("'{}' names both a file and a directory; keeping the directory", raw.name);
                self.entries[idx].ordinal = None;
            } else {
                self.entries[idx] = entry;
            }
            return Ok(());
        }

        self.entries.push(entry);
        self.path_index.insert(path.clone(), self.entries.len() - 1);
        if raw.kind == EntryKind::Dir {
            self.dir_tree.entry(path.clone()).or_default();
        }
        self.link(path);
        Ok(())
    }

    /// Registers `path` with its parent, inferring missing ancestors.
    fn link(&mut self, path: String) {
        let mut current = path;
        loop {
            let parent = parent_path(&current);
            self.dir_tree
                .entry(parent.clone())
                .or_default()
                .push(file_name(&current));
            if parent.is_empty() {
                return;
            }
            if let Some(&idx) = self.path_index.get(&parent) {
                self.promote(idx);
                return;
            }
            self.entries.push(FsEntry::implicit_dir(parent.clone()));
            self.path_index.insert(parent.clone(), self.entries.len() - 1);
            current = parent;
        }
    }

    /// Turns a non-directory entry that has children into an inferred
    /// directory, so its children stay reachable.
    fn promote(&mut self, idx: usize) {
        let entry = &mut self.entries[idx];
        if entry.is_dir() {
            return;
        }
        log::warn!("'{}' names both a file and a directory; keeping the directory", entry.path);
        *entry = FsEntry::implicit_dir(std::mem::take(&mut entry.path));
    }

    /// Returns the detected container kind.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Returns the archive comment (zip only).
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Returns true if any entry is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Returns the entry at `path`; the root has no entry.
    pub fn stat(&self, path: &str) -> Option<&FsEntry> {
        let path = normalize_entry(path);
        let &idx = self.path_index.get(&path)?;
        Some(&self.entries[idx])
    }

    /// Returns true for the root, explicit and inferred directories.
    pub fn is_dir(&self, path: &str) -> bool {
        let path = normalize_entry(path);
        path.is_empty() || self.stat(&path).is_some_and(FsEntry::is_dir)
    }

    /// Returns true when `ordinal` is the entry currently indexed for `name`.
    ///
    /// Superseded duplicates return false.
    pub fn is_current(&self, name: &str, ordinal: usize) -> bool {
        self.stat(name).is_some_and(|e| e.ordinal == Some(ordinal))
    }

    /// Lists the immediate children of a directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `path` is missing or is not a directory.
    pub fn read_dir(&self, path: &str) -> Result<Vec<Object>> {
        let path = normalize_entry(path);
        if !self.is_dir(&path) {
            return Err(Error::not_found(path));
        }
        let Some(children) = self.dir_tree.get(&path) else {
            return Ok(Vec::new());
        };
        Ok(children
            .iter()
            .filter_map(|name| self.stat(&join(&path, name)))
            .map(FsEntry::to_object)
            .collect())
    }

    /// Returns every entry below `path` in depth-first order, parents first.
    pub fn walk(&self, path: &str) -> Vec<&FsEntry> {
        let mut out = Vec::new();
        let mut stack = vec![normalize_entry(path)];
        let mut first = true;
        while let Some(current) = stack.pop() {
            if !std::mem::take(&mut first) {
                match self.stat(&current) {
                    Some(entry) => out.push(entry),
                    None => continue,
                }
            }
            if let Some(children) = self.dir_tree.get(&current) {
                // Reversed so siblings pop in archive order.
                stack.extend(children.iter().rev().map(|name| join(&current, name)));
            }
        }
        out
    }

    /// Counts regular files below `path`.
    pub fn file_count(&self, path: &str) -> usize {
        self.walk(path)
            .into_iter()
            .filter(|e| e.kind == EntryKind::File)
            .count()
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Gets the parent path of a normalized path; the root is empty.
fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => String::new(),
    }
}

/// Gets the last component of a normalized path.
fn file_name(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => path[pos + 1..].to_string(),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, kind: EntryKind, size: u64) -> RawEntry {
        RawEntry {
            name: name.to_string(),
            size,
            modified: None,
            kind,
            encrypted: false,
        }
    }

    fn fs(entries: Vec<RawEntry>) -> ArchiveFs {
        let scan = Scan {
            entries,
            comment: "hello".to_string(),
        };
        ArchiveFs::from_scan(ContainerKind::Zip, scan).unwrap()
    }

    #[test]
    fn implicit_directories() {
        let fs = fs(vec![
            raw("a/b/c.txt", EntryKind::File, 3),
            raw("top.txt", EntryKind::File, 1),
        ]);
        assert!(fs.is_dir("a"));
        assert!(fs.is_dir("/a/b/"));
        assert_eq!(fs.stat("a/b").unwrap().ordinal, None);

        let root: Vec<_> = fs.read_dir("").unwrap().into_iter().map(|o| o.name).collect();
        assert_eq!(root, ["a", "top.txt"]);
        let inner = fs.read_dir("a/b").unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].size, 3);
        assert!(!inner[0].is_folder);
        assert_eq!(fs.comment(), "hello");
    }

    #[test]
    fn read_dir_errors() {
        let fs = fs(vec![raw("f.txt", EntryKind::File, 1), raw("d/", EntryKind::Dir, 0)]);
        assert!(fs.read_dir("missing").unwrap_err().is_not_found());
        assert!(fs.read_dir("f.txt").unwrap_err().is_not_found());
        assert!(fs.read_dir("d").unwrap().is_empty());
    }

    #[test]
    fn later_duplicate_wins() {
        let fs = fs(vec![
            raw("x.txt", EntryKind::File, 1),
            raw("./x.txt", EntryKind::File, 9),
        ]);
        assert_eq!(fs.read_dir("").unwrap().len(), 1);
        assert_eq!(fs.stat("x.txt").unwrap().size, 9);
        assert!(!fs.is_current("x.txt", 0));
        assert!(fs.is_current("./x.txt", 1));
    }

    #[test]
    fn file_with_children_becomes_directory() {
        let fs = fs(vec![
            raw("a", EntryKind::File, 5),
            raw("a/b.txt", EntryKind::File, 2),
            raw("c/d.txt", EntryKind::File, 1),
            raw("c", EntryKind::File, 7),
        ]);
        for dir in ["a", "c"] {
            let entry = fs.stat(dir).unwrap();
            assert!(entry.is_dir(), "{dir}");
            assert_eq!(entry.ordinal, None);
        }
        let names: Vec<_> = fs.read_dir("a").unwrap().into_iter().map(|o| o.name).collect();
        assert_eq!(names, ["b.txt"]);
        assert_eq!(fs.read_dir("c").unwrap().len(), 1);
        assert!(!fs.is_current("a", 0));
        assert!(!fs.is_current("c", 3));
        assert_eq!(fs.file_count(""), 2);
        let root: Vec<_> = fs.read_dir("").unwrap().into_iter().map(|o| o.is_folder).collect();
        assert_eq!(root, [true, true]);
    }

    #[test]
    fn nul_names_rejected() {
        let scan = Scan {
            entries: vec![raw("bad\0name", EntryKind::File, 1)],
            comment: String::new(),
        };
        let err = ArchiveFs::from_scan(ContainerKind::Zip, scan).unwrap_err();
        assert!(err.is_illegal_path());
    }

    #[test]
    fn walk_is_preorder() {
        let fs = fs(vec![
            raw("d/", EntryKind::Dir, 0),
            raw("d/a.txt", EntryKind::File, 1),
            raw("d/s/b.txt", EntryKind::File, 1),
            raw("e.txt", EntryKind::File, 1),
        ]);
        let all: Vec<_> = fs.walk("").iter().map(|e| e.path.as_str()).collect();
        assert_eq!(all, ["d", "d/a.txt", "d/s", "d/s/b.txt", "e.txt"]);
        let sub: Vec<_> = fs.walk("d/s").iter().map(|e| e.path.as_str()).collect();
        assert_eq!(sub, ["d/s/b.txt"]);
        assert_eq!(fs.file_count(""), 3);
        assert_eq!(fs.file_count("d"), 2);
    }
}
