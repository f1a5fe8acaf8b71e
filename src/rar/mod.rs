//! RAR adapter backed by the UnRAR library.
//!
//! The library only offers a forward cursor over file headers, so every
//! operation makes a fresh pass from the first volume. There is no random
//! directory listing: [`Tool::list`] reports [`Error::NotSupported`].
//!
//! Multi-volume sets are named `name.part1.rar`, `name.part2.rar`, ...; the
//! caller passes every volume in order and the adapter makes them visible to
//! the library under those names (see [`volume`]).

mod host;
mod volume;

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

use tempfile::TempDir;
use unrar::error::{Code, UnrarError};

use self::host::Host;
use self::volume::VolumeSet;
use crate::archive_path::normalize_entry;
use crate::decompress::{
    EntryKind, InnerTarget, Placement, create_dir, create_file, place_whole, restore_mtime,
    restrict_file,
};
use crate::model::{ArchiveArgs, ArchiveInnerArgs, ArchiveMeta, Entry};
use crate::password::Password;
use crate::progress::ProgressTracker;
use crate::source::ArchiveSource;
use crate::timestamp;
use crate::tool::{Capabilities, EntryStream, MultipartDescriptor, Tool};
use crate::tree::build_tree;
use crate::{Error, Result};

type Cursor = unrar::OpenArchive<unrar::Process, unrar::CursorBeforeHeader>;
type AtFile = unrar::OpenArchive<unrar::Process, unrar::CursorBeforeFile>;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;
const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;

static EXTENSIONS: &[&str] = &[".rar"];
static MULTIPART: &[(&str, MultipartDescriptor)] = &[(volume::FIRST_VOLUME, volume::CONTINUATION)];

/// Adapter for single and multi-volume RAR archives.
#[derive(Debug, Clone, Default)]
pub struct RarTool {
    _private: (),
}

impl RarTool {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Owned copy of the fields of one file header.
#[derive(Debug, Clone)]
struct Header {
    name: String,
    size: u64,
    modified: Option<SystemTime>,
    kind: EntryKind,
    encrypted: bool,
}

impl Header {
    fn read(header: &unrar::FileHeader, host: Host) -> Self {
        Self {
            name: header.filename.to_string_lossy().into_owned(),
            size: header.unpacked_size,
            modified: timestamp::from_dos_packed(header.file_time),
            kind: classify(header.is_directory(), header.file_attr, host),
            encrypted: header.is_encrypted(),
        }
    }

    fn to_entry(&self) -> Entry {
        let entry = match self.kind {
            EntryKind::Dir => Entry::directory(self.name.clone()),
            _ => Entry::file(self.name.clone(), self.size),
        };
        entry
            .with_modified(self.modified)
            .with_encrypted(self.encrypted)
    }

    fn error(&self, err: UnrarError) -> Error {
        map_error(err, Some(self))
    }
}

/// Classifies an entry from its attribute word, read per `host`.
///
/// With an unknown host both readings apply, so a link is never taken for
/// a file.
fn classify(is_directory: bool, attr: u32, host: Host) -> EntryKind {
    let unix_link = attr & S_IFMT == S_IFLNK;
    let windows_link = attr & FILE_ATTRIBUTE_REPARSE_POINT != 0;
    let is_link = match host {
        Host::Unix => unix_link,
        Host::Windows => windows_link,
        Host::Unknown => unix_link || windows_link,
    };
    if is_directory {
        EntryKind::Dir
    } else if is_link {
        EntryKind::Other
    } else {
        EntryKind::File
    }
}

fn map_error(err: UnrarError, header: Option<&Header>) -> Error {
    let entry = header.map(|h| h.name.clone());
    match err.code {
        Code::MissingPassword => Error::PasswordRequired,
        Code::BadPassword => Error::WrongPassword { entry },
        // A wrong key on an encrypted entry fails the checksum.
        Code::BadData if header.is_some_and(|h| h.encrypted) => Error::WrongPassword { entry },
        Code::EOpen | Code::ECreate | Code::EClose | Code::ERead | Code::EWrite => {
            Error::Io(std::io::Error::other(err.to_string()))
        }
        _ => Error::InvalidFormat(err.to_string()),
    }
}

fn archive<'a>(path: &'a Path, password: Option<&'a Password>) -> unrar::Archive<'a> {
    match password {
        Some(p) => unrar::Archive::with_password(path, p.as_bytes()),
        None => unrar::Archive::new(path),
    }
}

fn open_cursor(volumes: &VolumeSet, password: Option<&Password>) -> Result<Cursor> {
    archive(volumes.first(), password)
        .open_for_processing()
        .map_err(|e| map_error(e, None))
}

/// Runs a header-only pass, dropping repeated headers of split files.
fn list_headers(volumes: &VolumeSet, password: Option<&Password>) -> Result<Vec<Header>> {
    let host = host::detect(volumes.first());
    let listing = archive(volumes.first(), password)
        .open_for_listing()
        .map_err(|e| map_error(e, None))?;
    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    for item in listing {
        let header = Header::read(&item.map_err(|e| map_error(e, None))?, host);
        if seen.insert(header.name.clone()) {
            headers.push(header);
        }
    }
    Ok(headers)
}

/// Counts files a decompress of normalized `inner` will write.
fn count_files(headers: &[Header], inner: &str) -> u64 {
    let prefix = format!("{inner}/");
    headers
        .iter()
        .filter(|h| h.kind == EntryKind::File)
        .filter(|h| {
            let name = normalize_entry(&h.name);
            inner.is_empty() || name == inner || name.starts_with(&prefix)
        })
        .count() as u64
}

/// Extracts the file under the cursor to `dest`, which must not exist yet.
fn extract_file(at: AtFile, header: &Header, dest: &Path) -> Result<Cursor> {
    // Claim the path exclusively; the library then writes over our empty file.
    drop(create_file(dest)?);
    log::debug!("extracting '{}' to '{}'", header.name, dest.display());
    let cursor = at.extract_to(dest).map_err(|e| header.error(e))?;
    restrict_file(dest)?;
    restore_mtime(dest, header.modified);
    Ok(cursor)
}

/// A single entry extracted to a private temp directory.
struct Spooled {
    file: File,
    _dir: TempDir,
}

impl Read for Spooled {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Tool for RarTool {
    fn name(&self) -> &'static str {
        "rar"
    }

    fn accepted_extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn accepted_multipart_patterns(&self) -> &'static [(&'static str, MultipartDescriptor)] {
        MULTIPART
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SEQUENTIAL
    }

    fn get_meta(&self, sources: &mut [ArchiveSource], args: &ArchiveArgs) -> Result<ArchiveMeta> {
        let volumes = VolumeSet::prepare(sources)?;
        let headers = list_headers(&volumes, args.password())?;
        let built = build_tree(headers.iter().map(Header::to_entry))?;
        Ok(ArchiveMeta {
            comment: String::new(),
            encrypted: built.encrypted,
            tree: built.roots,
        })
    }

    fn extract<'a>(
        &self,
        sources: &'a mut [ArchiveSource],
        args: &ArchiveInnerArgs,
    ) -> Result<EntryStream<'a>> {
        let volumes = VolumeSet::prepare(sources)?;
        let inner = args.normalized();
        let host = host::detect(volumes.first());
        let mut cursor = open_cursor(&volumes, args.password())?;

        while let Some(at) = cursor.read_header().map_err(|e| map_error(e, None))? {
            let header = Header::read(at.entry(), host);
            if normalize_entry(&header.name) != inner {
                cursor = at.skip().map_err(|e| header.error(e))?;
                continue;
            }
            match header.kind {
                // Directories have no stream.
                EntryKind::Dir => break,
                EntryKind::Other => return Err(Error::illegal_path(header.name)),
                EntryKind::File => {
                    let dir = tempfile::tempdir()?;
                    let dest = dir.path().join("entry");
                    extract_file(at, &header, &dest)?;
                    let file = File::open(&dest)?;
                    let spooled = Spooled { file, _dir: dir };
                    return Ok(EntryStream::new(spooled, header.size));
                }
            }
        }
        Err(Error::not_found(inner))
    }

    fn decompress(
        &self,
        sources: &mut [ArchiveSource],
        output: &Path,
        args: &ArchiveInnerArgs,
        progress: &mut dyn FnMut(f64),
    ) -> Result<()> {
        let volumes = VolumeSet::prepare(sources)?;
        let password = args.password();
        let inner = args.normalized();
        let total = count_files(&list_headers(&volumes, password)?, &inner);
        let mut tracker = ProgressTracker::new(progress);

        if inner.is_empty() {
            decompress_all(&volumes, password, output, total, &mut tracker)?;
        } else {
            decompress_inner(&volumes, password, output, &inner, total, &mut tracker)?;
        }
        tracker.finish();
        Ok(())
    }
}

fn decompress_all(
    volumes: &VolumeSet,
    password: Option<&Password>,
    output: &Path,
    total: u64,
    tracker: &mut ProgressTracker<'_>,
) -> Result<()> {
    let host = host::detect(volumes.first());
    let mut cursor = open_cursor(volumes, password)?;
    let mut seen = HashSet::new();
    let mut done = 0u64;

    while let Some(at) = cursor.read_header().map_err(|e| map_error(e, None))? {
        let header = Header::read(at.entry(), host);
        if !seen.insert(header.name.clone()) {
            cursor = at.skip().map_err(|e| header.error(e))?;
            continue;
        }
        cursor = match place_whole(output, &header.name, header.kind)? {
            Placement::Skip => at.skip().map_err(|e| header.error(e))?,
            Placement::Dir(dir) => {
                create_dir(&dir)?;
                at.skip().map_err(|e| header.error(e))?
            }
            Placement::File(dest) | Placement::Last(dest) => {
                let next = extract_file(at, &header, &dest)?;
                done += 1;
                tracker.report_fraction(done, total);
                next
            }
        };
    }
    Ok(())
}

fn decompress_inner(
    volumes: &VolumeSet,
    password: Option<&Password>,
    output: &Path,
    inner: &str,
    total: u64,
    tracker: &mut ProgressTracker<'_>,
) -> Result<()> {
    let host = host::detect(volumes.first());
    let mut cursor = open_cursor(volumes, password)?;
    let mut plan = InnerTarget::new(output, inner);
    let mut seen = HashSet::new();
    let mut done = 0u64;

    while let Some(at) = cursor.read_header().map_err(|e| map_error(e, None))? {
        let header = Header::read(at.entry(), host);
        if !seen.insert(header.name.clone()) {
            cursor = at.skip().map_err(|e| header.error(e))?;
            continue;
        }
        cursor = match plan.place(&header.name, header.kind)? {
            Placement::Skip | Placement::Dir(_) => at.skip().map_err(|e| header.error(e))?,
            Placement::File(dest) => {
                let next = extract_file(at, &header, &dest)?;
                done += 1;
                tracker.report_fraction(done, total);
                next
            }
            Placement::Last(dest) => {
                extract_file(at, &header, &dest)?;
                break;
            }
        };
    }

    if !plan.found() {
        return Err(Error::not_found(inner));
    }
    Ok(())
}
