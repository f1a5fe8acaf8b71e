//! Tree reconstruction for formats that only record flat entry paths.
//!
//! Zip, tar and RAR store each entry with its full path, and many archives
//! never list intermediate directories. [`build_tree`] infers those
//! directories and produces a nested [`TreeNode`] forest.
//!
//! Construction is iterative: nodes live in an arena keyed by their cleaned
//! directory path, and ancestor creation walks upward until it meets a path
//! already present, so every directory is created exactly once.
//!
//! # Example
//!
//! ```
//! use arcwalk::{tree::build_tree, Entry};
//!
//! let built = build_tree([Entry::file("a/b.txt", 3), Entry::file("a/c/d.txt", 4)]).unwrap();
//! assert_eq!(built.roots.len(), 1);
//! let a = &built.roots[0];
//! let names: Vec<_> = a.children.iter().map(|c| c.name.as_str()).collect();
//! assert_eq!(names, ["b.txt", "c"]);
//! ```

use std::collections::HashMap;
use std::time::SystemTime;

use crate::archive_path::{base, clean, dir, to_slash};
use crate::model::{Entry, TreeNode};
use crate::{Error, Result};

const ROOT: &str = ".";

/// Output of [`build_tree`].
#[derive(Debug, Clone, Default)]
pub struct BuiltTree {
    /// True if at least one entry was encrypted.
    pub encrypted: bool,
    /// Children of the synthetic root, in first-discovery order.
    pub roots: Vec<TreeNode>,
}

struct Slot {
    name: String,
    size: u64,
    modified: Option<SystemTime>,
    is_folder: bool,
    children: Vec<usize>,
}

impl Slot {
    fn folder(name: &str, modified: Option<SystemTime>) -> Self {
        Self {
            name: name.to_string(),
            size: 0,
            modified,
            is_folder: true,
            children: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Builder {
    slots: Vec<Slot>,
    dirs: HashMap<String, usize>,
}

impl Builder {
    fn new() -> Self {
        let mut b = Self::default();
        b.slots.push(Slot::folder(ROOT, None));
        b.dirs.insert(ROOT.to_string(), 0);
        b
    }

    /// Returns the slot for directory `path`, creating it when missing.
    fn ensure_dir(&mut self, path: &str, modified: Option<SystemTime>) -> (usize, bool) {
        if let Some(&idx) = self.dirs.get(path) {
            return (idx, false);
        }
        let idx = self.slots.len();
        self.slots.push(Slot::folder(base(path), modified));
        self.dirs.insert(path.to_string(), idx);
        (idx, true)
    }

    /// Attaches a freshly created directory to its parent chain.
    fn link_ancestors(&mut self, path: &str, idx: usize) {
        let mut child = idx;
        let mut current = path.to_string();
        loop {
            let parent = dir(&current);
            if let Some(&existing) = self.dirs.get(&parent) {
                self.slots[existing].children.push(child);
                return;
            }
            let (created, _) = self.ensure_dir(&parent, None);
            self.slots[created].children.push(child);
            child = created;
            current = parent;
        }
    }

    fn add(&mut self, entry: Entry) {
        let slashed = to_slash(&entry.path);
        let name = slashed.trim_start_matches('/');

        if entry.is_dir {
            let path = clean(name.trim_end_matches('/'));
            if path == ROOT {
                return;
            }
            let (idx, created) = self.ensure_dir(&path, entry.modified);
            let slot = &mut self.slots[idx];
            slot.is_folder = true;
            slot.name = base(&path).to_string();
            slot.modified = entry.modified;
            if created {
                self.link_ancestors(&path, idx);
            }
            return;
        }

        let parent = dir(name);
        let (parent_idx, created) = self.ensure_dir(&parent, entry.modified);
        let idx = self.slots.len();
        self.slots.push(Slot {
            name: base(name).to_string(),
            size: entry.size,
            modified: entry.modified,
            is_folder: false,
            children: Vec::new(),
        });
        self.slots[parent_idx].children.push(idx);
        if created {
            self.link_ancestors(&parent, parent_idx);
        }
    }

    /// Converts the arena into owned nodes without recursion.
    fn finish(mut self) -> Vec<TreeNode> {
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.slots[idx].children.iter().copied());
        }

        let mut built: Vec<Option<TreeNode>> = (0..self.slots.len()).map(|_| None).collect();
        for &idx in order.iter().rev() {
            let slot = &mut self.slots[idx];
            let children = std::mem::take(&mut slot.children)
                .into_iter()
                .filter_map(|c| built[c].take())
                .collect();
            built[idx] = Some(TreeNode {
                name: std::mem::take(&mut slot.name),
                size: slot.size,
                modified: slot.modified,
                is_folder: slot.is_folder,
                children,
            });
        }

        built
            .into_iter()
            .next()
            .flatten()
            .map(|root| root.children)
            .unwrap_or_default()
    }
}

/// Builds a directory tree from an ordered sequence of flat entries.
///
/// Directories referenced only as ancestors of files are created implicitly.
/// A directory entry seen after its implicit creation refreshes the node's
/// metadata without moving it.
///
/// # Errors
///
/// Returns [`Error::IllegalPath`] for an entry whose name contains a NUL
/// byte. Other hostile names (`..`, absolute) are kept in the listing and
/// rejected only when extracted.
pub fn build_tree<I>(entries: I) -> Result<BuiltTree>
where
    I: IntoIterator<Item = Entry>,
{
    let mut builder = Builder::new();
    let mut encrypted = false;

    for entry in entries {
        if entry.path.contains('\0') {
            return Err(Error::illegal_path(entry.path));
        }
        encrypted |= entry.is_encrypted;
        builder.add(entry);
    }

    Ok(BuiltTree {
        encrypted,
        roots: builder.finish(),
    })
}
