//! Request and result types shared by every archive tool.

use std::time::SystemTime;

use crate::archive_path::normalize_inner;
use crate::password::Password;

/// One entry as recorded by a flat-listing archive format.
///
/// The path is the format-native name and may look absolute or contain
/// backslashes; consumers normalize it before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry name as stored in the archive.
    pub path: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Modification time, when the format records one.
    pub modified: Option<SystemTime>,
    /// True for directory entries.
    pub is_dir: bool,
    /// True if the entry payload is encrypted.
    pub is_encrypted: bool,
}

impl Entry {
    /// Creates a regular file entry.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            modified: None,
            is_dir: false,
            is_encrypted: false,
        }
    }

    /// Creates a directory entry.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            modified: None,
            is_dir: true,
            is_encrypted: false,
        }
    }

    /// Sets the modification time.
    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    /// Marks the entry as encrypted.
    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.is_encrypted = encrypted;
        self
    }
}

/// An immediate child returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Base name of the child.
    pub name: String,
    /// Size in bytes (zero for folders).
    pub size: u64,
    /// Modification time, if known.
    pub modified: Option<SystemTime>,
    /// True for folders.
    pub is_folder: bool,
}

/// A node in a reconstructed archive tree.
///
/// Children keep first-seen order; they are never sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Base name of the node.
    pub name: String,
    /// Size in bytes (zero for folders).
    pub size: u64,
    /// Modification time, if known.
    pub modified: Option<SystemTime>,
    /// True for folders.
    pub is_folder: bool,
    /// Ordered child nodes.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Returns the number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }

    /// Looks up a descendant by slash-separated relative path.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, part| {
                node.children.iter().find(|c| c.name == part)
            })
    }
}

impl From<Object> for TreeNode {
    fn from(obj: Object) -> Self {
        Self {
            name: obj.name,
            size: obj.size,
            modified: obj.modified,
            is_folder: obj.is_folder,
            children: Vec::new(),
        }
    }
}

/// Returns the total node count of a forest of root children.
pub fn tree_count(nodes: &[TreeNode]) -> usize {
    nodes.iter().map(TreeNode::count).sum()
}

/// Archive-level request parameters.
#[derive(Debug, Clone, Default)]
pub struct ArchiveArgs {
    /// Password for encrypted entries or headers.
    pub password: Option<Password>,
}

impl ArchiveArgs {
    /// Creates arguments without a password.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the password. An empty string clears it.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = Password::new(password);
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Returns the password, if one was supplied.
    pub fn password(&self) -> Option<&Password> {
        self.password.as_ref()
    }
}

/// Parameters addressing a path inside an archive.
///
/// An inner path of `"/"` denotes the archive root.
#[derive(Debug, Clone)]
pub struct ArchiveInnerArgs {
    /// Archive-level parameters.
    pub args: ArchiveArgs,
    /// Path inside the archive.
    pub inner_path: String,
}

impl ArchiveInnerArgs {
    /// Addresses `inner_path` without a password.
    pub fn new(inner_path: impl Into<String>) -> Self {
        Self {
            args: ArchiveArgs::new(),
            inner_path: inner_path.into(),
        }
    }

    /// Addresses the archive root.
    pub fn root() -> Self {
        Self::new("/")
    }

    /// Sets the password. An empty string clears it.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.args = self.args.with_password(password);
        self
    }

    /// Returns the password, if one was supplied.
    pub fn password(&self) -> Option<&Password> {
        self.args.password()
    }

    /// Returns the inner path without leading separator; empty for the root.
    pub fn normalized(&self) -> String {
        normalize_inner(&self.inner_path)
    }
}

/// Result of a metadata request.
#[derive(Debug, Clone, Default)]
pub struct ArchiveMeta {
    /// Archive comment, empty when the format has none.
    pub comment: String,
    /// True if any entry (or the header) is encrypted.
    pub encrypted: bool,
    /// Root children of the archive tree.
    pub tree: Vec<TreeNode>,
}
