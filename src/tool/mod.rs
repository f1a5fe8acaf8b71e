//! The operation set every archive format implements.
//!
//! A [`Tool`] adapts one family of archive formats to a uniform contract:
//! metadata tree, directory listing, single-entry stream and recursive
//! decompression. Tools are looked up by file name through a
//! [`Registry`](registry::Registry).
//!
//! Formats whose structure cannot answer an operation cheaply say so through
//! [`Capabilities`] and return [`Error::NotSupported`] instead of emulating
//! it (a forward-only RAR stream has no random directory listing, for
//! example).

pub mod registry;

use std::io::{self, Read};
use std::path::Path;

use crate::model::{ArchiveArgs, ArchiveInnerArgs, ArchiveMeta, Object};
use crate::source::ArchiveSource;
use crate::{Error, Result};

/// Operations a tool can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// [`Tool::get_meta`] is available.
    pub get_meta: bool,
    /// [`Tool::list`] is available.
    pub list: bool,
    /// [`Tool::extract`] is available.
    pub extract: bool,
    /// [`Tool::decompress`] is available.
    pub decompress: bool,
}

impl Capabilities {
    /// Every operation is supported.
    pub const ALL: Self = Self {
        get_meta: true,
        list: true,
        extract: true,
        decompress: true,
    };

    /// Every operation except directory listing.
    pub const SEQUENTIAL: Self = Self {
        list: false,
        ..Self::ALL
    };
}

/// Locates continuation volumes of a multi-volume archive by name.
///
/// `pattern` contains a single `{}` placeholder for the volume number; the
/// second physical file uses `start`, the next `start + 1`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipartDescriptor {
    /// Continuation suffix with a `{}` placeholder, e.g. `".part{}.rar"`.
    pub pattern: &'static str,
    /// Volume number of the second file.
    pub start: u32,
}

impl MultipartDescriptor {
    /// Creates a descriptor.
    pub const fn new(pattern: &'static str, start: u32) -> Self {
        Self { pattern, start }
    }

    /// Returns the suffix for volume number `number`.
    pub fn suffix(&self, number: u32) -> String {
        self.pattern.replacen("{}", &number.to_string(), 1)
    }
}

/// A readable stream over exactly one archive entry.
///
/// The stream is meant to be consumed once.
pub struct EntryStream<'a> {
    reader: Box<dyn Read + 'a>,
    size: u64,
}

impl<'a> EntryStream<'a> {
    /// Wraps a reader yielding `size` bytes.
    pub fn new(reader: impl Read + 'a, size: u64) -> Self {
        Self {
            reader: Box::new(reader),
            size,
        }
    }

    /// Returns the uncompressed size of the entry.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Read for EntryStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for EntryStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStream")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Format adapter contract.
///
/// `sources` holds every physical file of the archive in volume order.
/// Single-volume formats only look at the first one.
pub trait Tool: Send + Sync {
    /// Short lowercase name, e.g. `"zip"`.
    fn name(&self) -> &'static str;

    /// Single-volume extensions (lowercase, with leading dot).
    fn accepted_extensions(&self) -> &'static [&'static str];

    /// First-volume suffixes and how to name their continuations.
    fn accepted_multipart_patterns(&self) -> &'static [(&'static str, MultipartDescriptor)] {
        &[]
    }

    /// Operations this tool answers.
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    /// Reads the archive comment, encryption flag and entry tree.
    fn get_meta(&self, sources: &mut [ArchiveSource], args: &ArchiveArgs) -> Result<ArchiveMeta>;

    /// Lists the immediate children of `args.inner_path`.
    fn list(&self, sources: &mut [ArchiveSource], args: &ArchiveInnerArgs) -> Result<Vec<Object>> {
        let _ = (sources, args);
        Err(Error::NotSupported {
            format: self.name(),
            operation: "list",
        })
    }

    /// Opens a stream over the single non-directory entry at `args.inner_path`.
    fn extract<'a>(
        &self,
        sources: &'a mut [ArchiveSource],
        args: &ArchiveInnerArgs,
    ) -> Result<EntryStream<'a>>;

    /// Extracts the whole archive (`inner_path == "/"`) or one file or
    /// subtree into `output`, reporting percentages through `progress`.
    fn decompress(
        &self,
        sources: &mut [ArchiveSource],
        output: &Path,
        args: &ArchiveInnerArgs,
        progress: &mut dyn FnMut(f64),
    ) -> Result<()>;
}

/// Returns the first source or an error when none were supplied.
pub(crate) fn primary(sources: &mut [ArchiveSource]) -> Result<&mut ArchiveSource> {
    sources
        .first_mut()
        .ok_or_else(|| Error::InvalidFormat("no archive source supplied".into()))
}
