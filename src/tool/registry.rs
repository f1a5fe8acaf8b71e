//! Extension-based lookup of archive tools.
//!
//! A [`Registry`] is an explicit value: build it with
//! [`Registry::with_defaults`] for every compiled-in format, or start from
//! [`Registry::new`] and [`register`](Registry::register) only the tools a
//! caller (or a test) needs.
//!
//! # Example
//!
//! ```
//! use arcwalk::Registry;
//!
//! let registry = Registry::with_defaults();
//! # #[cfg(feature = "rar")]
//! # {
//! let resolved = registry.resolve("Backup.part1.RAR").unwrap();
//! assert_eq!(resolved.tool.name(), "rar");
//! let parts = resolved.multipart.unwrap();
//! assert_eq!(parts.volume_name(1), "Backup.part2.rar");
//! # }
//! ```

use std::sync::Arc;

use super::{MultipartDescriptor, Tool};
use crate::{Error, Result};

/// Continuation naming for a resolved multi-volume archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartMatch {
    /// File name with the first-volume suffix removed, original case.
    pub stem: String,
    /// The first-volume suffix that matched, e.g. `".part1.rar"`.
    pub first_suffix: &'static str,
    /// How continuation volumes are named.
    pub descriptor: MultipartDescriptor,
}

impl MultipartMatch {
    /// Returns the file name of the volume at zero-based `index`.
    ///
    /// Index 0 is the first volume. No file is opened.
    pub fn volume_name(&self, index: usize) -> String {
        if index == 0 {
            return format!("{}{}", self.stem, self.first_suffix);
        }
        let number = self.descriptor.start + (index - 1) as u32;
        format!("{}{}", self.stem, self.descriptor.suffix(number))
    }

    /// Returns the first `count` volume names.
    pub fn volume_names(&self, count: usize) -> Vec<String> {
        (0..count).map(|i| self.volume_name(i)).collect()
    }
}

/// Result of [`Registry::resolve`].
#[derive(Clone)]
pub struct Resolved {
    /// The tool that accepts the file.
    pub tool: Arc<dyn Tool>,
    /// Set when the file name is a first-volume suffix.
    pub multipart: Option<MultipartMatch>,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("tool", &self.tool.name())
            .field("multipart", &self.multipart)
            .finish()
    }
}

struct Candidate {
    len: usize,
    tool: usize,
    multipart: Option<MultipartMatch>,
}

impl Candidate {
    fn offer(best: &mut Option<Self>, len: usize, tool: usize, multipart: Option<MultipartMatch>) {
        let better = match best {
            None => true,
            Some(b) => {
                len > b.len || (len == b.len && multipart.is_none() && b.multipart.is_some())
            }
        };
        if better {
            *best = Some(Self {
                len,
                tool,
                multipart,
            });
        }
    }
}

/// Table of registered tools.
#[derive(Clone, Default)]
pub struct Registry {
    tools: Vec<Arc<dyn Tool>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every tool enabled at compile time.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(any(
            feature = "zip",
            feature = "tar",
            feature = "gzip",
            feature = "bzip2",
            feature = "xz",
            feature = "zstd",
            feature = "brotli",
            feature = "lz4",
            feature = "zlib",
            feature = "snappy",
            feature = "lzip"
        ))]
        registry.register(Box::new(crate::container::ContainerTool::new()));
        #[cfg(feature = "rar")]
        registry.register(Box::new(crate::rar::RarTool::new()));
        #[cfg(feature = "iso")]
        registry.register(Box::new(crate::iso::IsoTool::new()));
        registry
    }

    /// Adds a tool. Earlier registrations win ties against later ones.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> &mut Self {
        log::debug!("registering archive tool '{}'", tool.name());
        self.tools.push(Arc::from(tool));
        self
    }

    /// Returns the registered tools in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    /// Returns the tool registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Selects the tool for a file name.
    ///
    /// Only the final path component is considered. Matching is ASCII
    /// case-insensitive and the longest matching suffix wins, so
    /// `.part1.rar` beats `.rar` and `.tar.gz` beats `.gz`. On equal length a
    /// single-volume extension is preferred over a multipart suffix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] when no tool accepts the name.
    pub fn resolve(&self, filename: &str) -> Result<Resolved> {
        let file = filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(filename);
        let lower = file.to_ascii_lowercase();

        let mut best: Option<Candidate> = None;
        for (idx, tool) in self.tools.iter().enumerate() {
            for ext in tool.accepted_extensions() {
                if lower.len() > ext.len() && lower.ends_with(ext) {
                    Candidate::offer(&mut best, ext.len(), idx, None);
                }
            }
            for (suffix, descriptor) in tool.accepted_multipart_patterns() {
                if lower.len() > suffix.len() && lower.ends_with(suffix) {
                    let m = MultipartMatch {
                        stem: file[..file.len() - suffix.len()].to_string(),
                        first_suffix: *suffix,
                        descriptor: *descriptor,
                    };
                    Candidate::offer(&mut best, suffix.len(), idx, Some(m));
                }
            }
        }

        match best {
            Some(c) => {
                let tool = Arc::clone(&self.tools[c.tool]);
                log::debug!("resolved '{}' to tool '{}'", filename, tool.name());
                Ok(Resolved {
                    tool,
                    multipart: c.multipart,
                })
            }
            None => Err(Error::UnsupportedFormat {
                name: filename.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.name()))
            .finish()
    }
}
