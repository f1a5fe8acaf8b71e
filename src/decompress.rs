//! Shared extraction logic used by every tool.
//!
//! Destination paths are planned here from archive entry names, always via
//! [`secure_join`]. Directories are created idempotently with owner-only
//! permissions; files are created exclusively, so an existing destination is
//! never overwritten.
//!
//! Two walk shapes exist:
//! - whole archive: every entry lands at its sanitized path under the output
//!   root ([`place_whole`]);
//! - inner target: one file lands under the output root by its base name,
//!   or one directory is recreated by its base name with descendants keeping
//!   their layout beneath it ([`InnerTarget`]).

use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::archive_path::{base, normalize_entry};
use crate::progress::{ProgressReader, ProgressTracker};
use crate::sanitize::secure_join;
use crate::{Error, READ_BUFFER_SIZE, Result};

/// What kind of filesystem object an archive entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    /// A directory.
    Dir,
    /// A regular file.
    File,
    /// Anything else (symlink, hard link, device, fifo).
    Other,
}

/// Where an entry goes on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Not part of the requested target.
    Skip,
    /// Create this directory.
    Dir(PathBuf),
    /// Write the entry to this file.
    File(PathBuf),
    /// Write the entry to this file; nothing else in the archive is wanted.
    Last(PathBuf),
}

/// Creates a directory and its missing parents with owner-only access.
pub(crate) fn create_dir(path: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)?;
    Ok(())
}

/// Creates a new file, failing if `path` already exists.
///
/// Missing parent directories are created first.
pub(crate) fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}

/// Resets a file written by an external extractor to owner-only access.
#[cfg_attr(not(feature = "rar"), allow(dead_code))]
pub(crate) fn restrict_file(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Restores a modification time; failures are logged, not returned.
pub(crate) fn restore_mtime(path: &Path, modified: Option<SystemTime>) {
    if let Some(mtime) = modified {
        let ft = filetime::FileTime::from_system_time(mtime);
        if let Err(e) = filetime::set_file_mtime(path, ft) {
            log::warn!(
                "Failed to set modification time on '{}': {}",
                path.display(),
                e
            );
        }
    }
}

fn copy_into<R: Read + ?Sized>(reader: &mut R, file: &mut File) -> Result<u64> {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        file.write_all(&buf[..n])?;
        total += n as u64;
    }
    file.flush()?;
    Ok(total)
}

/// Streams `reader` into a newly created file at `dest`.
pub(crate) fn write_entry<R: Read + ?Sized>(
    reader: &mut R,
    dest: &Path,
    modified: Option<SystemTime>,
) -> Result<u64> {
    log::debug!("extracting to '{}'", dest.display());
    let mut file = create_file(dest)?;
    let written = copy_into(reader, &mut file)?;
    drop(file);
    restore_mtime(dest, modified);
    Ok(written)
}

/// Like [`write_entry`], reporting byte progress of a `size`-byte entry.
pub(crate) fn write_entry_tracked<R: Read>(
    reader: R,
    dest: &Path,
    size: u64,
    modified: Option<SystemTime>,
    tracker: &mut ProgressTracker<'_>,
) -> Result<u64> {
    let mut tracked = ProgressReader::new(reader, size, tracker);
    write_entry(&mut tracked, dest, modified)
}

/// Plans an entry's destination for whole-archive extraction.
///
/// The entry naming the archive root itself (`"./"`) is skipped.
pub(crate) fn place_whole(output: &Path, name: &str, kind: EntryKind) -> Result<Placement> {
    match kind {
        EntryKind::Dir if normalize_entry(name).is_empty() => Ok(Placement::Skip),
        EntryKind::Dir => Ok(Placement::Dir(secure_join(output, name)?)),
        EntryKind::File => Ok(Placement::File(secure_join(output, name)?)),
        EntryKind::Other => Err(Error::illegal_path(name)),
    }
}

/// Returns true when entry `name` is the normalized inner path `inner` or
/// lies beneath it.
pub(crate) fn covers(inner: &str, name: &str) -> bool {
    let normalized = normalize_entry(name);
    match normalized.strip_prefix(inner) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Placement planner for extraction of a single inner path.
///
/// The base directory for a directory target is created lazily, the first
/// time either the target itself or one of its descendants is seen.
#[derive(Debug)]
pub(crate) struct InnerTarget {
    output: PathBuf,
    inner: String,
    prefix: String,
    base_dir: Option<PathBuf>,
    seen: bool,
}

impl InnerTarget {
    /// Plans extraction of normalized inner path `inner` into `output`.
    pub(crate) fn new(output: &Path, inner: &str) -> Self {
        Self {
            output: output.to_path_buf(),
            inner: inner.to_string(),
            prefix: format!("{inner}/"),
            base_dir: None,
            seen: false,
        }
    }

    /// Returns true once any part of the target has been seen.
    pub(crate) fn found(&self) -> bool {
        self.seen
    }

    fn ensure_base_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.base_dir {
            return Ok(dir.clone());
        }
        let dir = secure_join(&self.output, base(&self.inner))?;
        create_dir(&dir)?;
        self.base_dir = Some(dir.clone());
        self.seen = true;
        Ok(dir)
    }

    /// Decides where the entry `name` goes.
    ///
    /// Directory placements are already created when returned.
    pub(crate) fn place(&mut self, name: &str, kind: EntryKind) -> Result<Placement> {
        let normalized = normalize_entry(name);

        if normalized == self.inner {
            return match kind {
                EntryKind::Dir => Ok(Placement::Dir(self.ensure_base_dir()?)),
                EntryKind::Other => Err(Error::illegal_path(name)),
                EntryKind::File => {
                    let dest = secure_join(&self.output, base(&self.inner))?;
                    self.seen = true;
                    Ok(Placement::Last(dest))
                }
            };
        }

        let Some(rest) = normalized.strip_prefix(&self.prefix) else {
            return Ok(Placement::Skip);
        };
        let base_dir = self.ensure_base_dir()?;
        if rest.is_empty() || rest == "." {
            return Ok(Placement::Skip);
        }
        match kind {
            EntryKind::Dir => {
                let dir = secure_join(&base_dir, rest)?;
                create_dir(&dir)?;
                Ok(Placement::Dir(dir))
            }
            EntryKind::File => Ok(Placement::File(secure_join(&base_dir, rest)?)),
            EntryKind::Other => Err(Error::illegal_path(name)),
        }
    }
}
