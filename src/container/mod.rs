//! Generic adapter for zip, tar and single-stream compressed files.
//!
//! Every container is presented through [`ArchiveFs`](fs::ArchiveFs), a
//! metadata-only filesystem view, so listing and lookup behave the same
//! regardless of the underlying format. Payloads are read in a single
//! forward pass per operation.
//!
//! | Name | Read as |
//! |------|---------|
//! | `.zip` | zip (ZipCrypto and AES entries with a password) |
//! | `.tar` | tar |
//! | `.tar.gz` `.tgz` | gzip-compressed tar |
//! | `.tar.bz2` `.tbz2` `.tbz` | bzip2-compressed tar |
//! | `.tar.xz` `.txz` | xz-compressed tar |
//! | `.tar.zst` `.tzst` | zstd-compressed tar |
//! | `.tar.br` `.tar.lz4` `.tar.sz` `.tar.lz` `.tlz` | brotli, LZ4, Snappy or lzip tar |
//! | `.gz` `.bz2` `.xz` `.zst` `.br` `.lz4` `.zz` `.sz` `.s2` `.lz` | one file named after the stem, or tar when the payload is one |
//!
//! `.s2` is read with the Snappy framing decoder, so only S2 streams written
//! in Snappy-compatible mode open.

mod entries;
mod fs;
mod kind;
#[cfg(feature = "lzip")]
mod lzip;

use std::io::{Seek, SeekFrom};
use std::path::Path;

pub use kind::{Codec, ContainerKind};

use self::entries::{Flow, RawEntry};
use self::fs::ArchiveFs;
use crate::archive_path::normalize_entry;
use crate::decompress::{
    EntryKind, InnerTarget, Placement, covers, create_dir, place_whole, write_entry,
    write_entry_tracked,
};
use crate::model::{ArchiveArgs, ArchiveInnerArgs, ArchiveMeta, Object, TreeNode};
use crate::password::Password;
use crate::progress::ProgressTracker;
use crate::source::ArchiveSource;
use crate::tool::{EntryStream, Tool, primary};
use crate::{Error, Result};

/// Adapter for flat-entry containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerTool {
    _private: (),
}

impl ContainerTool {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Returns false for an entry that a later duplicate supersedes.
fn is_live(fs: &ArchiveFs, ordinal: usize, entry: &RawEntry) -> bool {
    // Names normalizing to the root are not indexed; the planners decide.
    normalize_entry(&entry.name).is_empty() || fs.is_current(&entry.name, ordinal)
}

impl Tool for ContainerTool {
    fn name(&self) -> &'static str {
        "container"
    }

    fn accepted_extensions(&self) -> &'static [&'static str] {
        kind::extensions()
    }

    fn get_meta(&self, sources: &mut [ArchiveSource], _args: &ArchiveArgs) -> Result<ArchiveMeta> {
        let fs = ArchiveFs::open(primary(sources)?)?;
        let tree = fs.read_dir("")?.into_iter().map(TreeNode::from).collect();
        Ok(ArchiveMeta {
            comment: fs.comment().to_string(),
            encrypted: fs.is_encrypted(),
            tree,
        })
    }

    fn list(&self, sources: &mut [ArchiveSource], args: &ArchiveInnerArgs) -> Result<Vec<Object>> {
        let fs = ArchiveFs::open(primary(sources)?)?;
        fs.read_dir(&args.normalized())
    }

    fn extract<'a>(
        &self,
        sources: &'a mut [ArchiveSource],
        args: &ArchiveInnerArgs,
    ) -> Result<EntryStream<'a>> {
        let source = primary(sources)?;
        let fs = ArchiveFs::open(source)?;
        let inner = args.normalized();
        let wanted = match fs.stat(&inner) {
            Some(entry) if entry.kind == EntryKind::File => entry.ordinal,
            Some(entry) if entry.kind == EntryKind::Other => {
                return Err(Error::illegal_path(inner));
            }
            _ => return Err(Error::not_found(inner)),
        };

        // Entry readers borrow the archive, so the payload is spooled to an
        // anonymous temp file that the returned stream owns.
        let mut spool = tempfile::tempfile()?;
        let mut copied = None;
        entries::stream(
            fs.kind(),
            source,
            args.password(),
            &mut |ordinal, _| wanted == Some(ordinal),
            &mut |_, reader| {
                copied = Some(std::io::copy(reader, &mut spool)?);
                Ok(Flow::Stop)
            },
        )?;

        let size = copied.ok_or_else(|| Error::not_found(inner.clone()))?;
        spool.seek(SeekFrom::Start(0))?;
        log::debug!("spooled '{}' ({} bytes)", inner, size);
        Ok(EntryStream::new(spool, size))
    }

    fn decompress(
        &self,
        sources: &mut [ArchiveSource],
        output: &Path,
        args: &ArchiveInnerArgs,
        progress: &mut dyn FnMut(f64),
    ) -> Result<()> {
        let source = primary(sources)?;
        let fs = ArchiveFs::open(source)?;
        let mut tracker = ProgressTracker::new(progress);
        let inner = args.normalized();

        if inner.is_empty() {
            decompress_all(&fs, source, output, args.password(), &mut tracker)?;
        } else {
            decompress_inner(&fs, source, output, &inner, args.password(), &mut tracker)?;
        }
        tracker.finish();
        Ok(())
    }
}

fn decompress_all(
    fs: &ArchiveFs,
    source: &mut ArchiveSource,
    output: &Path,
    password: Option<&Password>,
    tracker: &mut ProgressTracker<'_>,
) -> Result<()> {
    let total = fs.file_count("") as u64;
    let mut done = 0u64;

    entries::stream(
        fs.kind(),
        source,
        password,
        &mut |ordinal, entry| is_live(fs, ordinal, entry),
        &mut |entry, reader| {
            match place_whole(output, &entry.name, entry.kind)? {
                Placement::Skip => {}
                Placement::Dir(dir) => create_dir(&dir)?,
                Placement::File(dest) | Placement::Last(dest) => {
                    write_entry(reader, &dest, entry.modified)?;
                    done += 1;
                    tracker.report_fraction(done, total);
                }
            }
            Ok(Flow::Continue)
        },
    )
}

fn decompress_inner(
    fs: &ArchiveFs,
    source: &mut ArchiveSource,
    output: &Path,
    inner: &str,
    password: Option<&Password>,
    tracker: &mut ProgressTracker<'_>,
) -> Result<()> {
    let target = fs.stat(inner).ok_or_else(|| Error::not_found(inner))?;
    let total = match target.kind {
        EntryKind::File => 1,
        EntryKind::Dir => fs.file_count(inner) as u64,
        EntryKind::Other => return Err(Error::illegal_path(inner)),
    };
    let target_size = target.size;
    let mut plan = InnerTarget::new(output, inner);
    let mut done = 0u64;

    entries::stream(
        fs.kind(),
        source,
        password,
        &mut |ordinal, entry| covers(inner, &entry.name) && is_live(fs, ordinal, entry),
        &mut |entry, reader| match plan.place(&entry.name, entry.kind)? {
            Placement::Skip | Placement::Dir(_) => Ok(Flow::Continue),
            Placement::File(dest) => {
                write_entry(reader, &dest, entry.modified)?;
                done += 1;
                tracker.report_fraction(done, total);
                Ok(Flow::Continue)
            }
            Placement::Last(dest) => {
                write_entry_tracked(reader, &dest, target_size, entry.modified, tracker)?;
                Ok(Flow::Stop)
            }
        },
    )?;

    if !plan.found() {
        return Err(Error::not_found(inner));
    }
    Ok(())
}
