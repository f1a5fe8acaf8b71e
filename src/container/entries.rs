//! Entry enumeration and payload streaming for each container kind.
//!
//! [`scan`] reads metadata only (zip central directory, tar headers) and
//! never decrypts or decompresses a bare stream. [`stream`] makes one
//! forward pass: a selector sees each entry's metadata first, and only
//! selected entries are opened and handed to the visitor, which can stop
//! the pass early.

use std::io::{self, Read};
use std::time::SystemTime;

use super::kind::ContainerKind;
use crate::decompress::EntryKind;
use crate::password::Password;
use crate::source::ArchiveSource;
use crate::{Error, Result};

/// One entry as recorded by the container.
#[derive(Debug, Clone)]
pub(crate) struct RawEntry {
    /// Name as stored in the archive.
    pub name: String,
    /// Uncompressed size; zero when unknown.
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub kind: EntryKind,
    pub encrypted: bool,
}

/// Whether a [`stream`] pass continues after the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Metadata of every entry plus the archive comment.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub entries: Vec<RawEntry>,
    pub comment: String,
}

/// Callback receiving each entry and its payload.
pub(crate) type Visitor<'f> = dyn FnMut(&RawEntry, &mut dyn Read) -> Result<Flow> + 'f;

/// Decides from metadata alone whether an entry's payload is opened.
///
/// Receives the entry's position in archive order, the same ordinal that
/// [`scan`] assigns.
pub(crate) type Select<'f> = dyn FnMut(usize, &RawEntry) -> bool + 'f;

/// Reads entry metadata without touching payloads.
pub(crate) fn scan(kind: ContainerKind, source: &mut ArchiveSource) -> Result<Scan> {
    source.rewind()?;
    match kind {
        #[cfg(feature = "zip")]
        ContainerKind::Zip => zip_backend::scan(source),
        #[cfg(feature = "tar")]
        ContainerKind::Tar(codec) => {
            let mut entries = Vec::new();
            tar_backend::stream(codec, source, &mut |_, _| true, &mut |entry, _| {
                entries.push(entry.clone());
                Ok(Flow::Continue)
            })?;
            Ok(Scan {
                entries,
                comment: String::new(),
            })
        }
        ContainerKind::Compressed(_) => {
            // The decoded length is unknown until the stream is read, so the
            // index carries the compressed size.
            Ok(Scan {
                entries: vec![single_entry(source_stem(source), source.size())],
                comment: String::new(),
            })
        }
    }
}

/// Streams the payload of every entry `select` accepts through `visit`,
/// in archive order.
///
/// Rejected entries are never opened, so an encrypted entry outside the
/// selection needs no password.
pub(crate) fn stream(
    kind: ContainerKind,
    source: &mut ArchiveSource,
    password: Option<&Password>,
    select: &mut Select<'_>,
    visit: &mut Visitor<'_>,
) -> Result<()> {
    source.rewind()?;
    match kind {
        #[cfg(feature = "zip")]
        ContainerKind::Zip => zip_backend::stream(source, password, select, visit),
        #[cfg(feature = "tar")]
        ContainerKind::Tar(codec) => {
            let _ = password;
            tar_backend::stream(codec, source, select, visit)
        }
        ContainerKind::Compressed(codec) => {
            let _ = password;
            let entry = single_entry(source_stem(source), source.size());
            if !select(0, &entry) {
                return Ok(());
            }
            let mut decoder = codec.decoder(&mut *source)?;
            visit(&entry, &mut decoder).map(|_| ())
        }
    }
}

fn source_stem(source: &ArchiveSource) -> String {
    super::kind::stem(source.name())
}

fn single_entry(name: String, size: u64) -> RawEntry {
    RawEntry {
        name,
        size,
        modified: None,
        kind: EntryKind::File,
        encrypted: false,
    }
}

/// Maps a read failure on an encrypted entry to a password error.
///
/// Decryption with a wrong key usually passes the header check and then
/// fails the checksum, which surfaces as `InvalidData`.
pub(crate) fn password_aware(err: Error, entry: &RawEntry) -> Error {
    match err {
        Error::Io(e) if entry.encrypted && e.kind() == io::ErrorKind::InvalidData => {
            Error::WrongPassword {
                entry: Some(entry.name.clone()),
            }
        }
        other => other,
    }
}

#[cfg(feature = "zip")]
mod zip_backend {
    use super::*;
    use crate::timestamp;
    use zip::result::ZipError;

    const S_IFMT: u32 = 0o170000;
    const S_IFREG: u32 = 0o100000;
    const S_IFDIR: u32 = 0o040000;

    pub(super) fn map_error(err: ZipError, entry: Option<&str>) -> Error {
        match err {
            ZipError::Io(e) => Error::Io(e),
            ZipError::InvalidPassword => Error::WrongPassword {
                entry: entry.map(str::to_string),
            },
            ZipError::UnsupportedArchive(msg) if msg == ZipError::PASSWORD_REQUIRED => {
                Error::PasswordRequired
            }
            ZipError::FileNotFound => Error::not_found(entry.unwrap_or_default()),
            other => Error::InvalidFormat(other.to_string()),
        }
    }

    fn classify(is_dir: bool, unix_mode: Option<u32>) -> EntryKind {
        if is_dir {
            return EntryKind::Dir;
        }
        match unix_mode.map(|m| m & S_IFMT) {
            None | Some(0) | Some(S_IFREG) => EntryKind::File,
            Some(S_IFDIR) => EntryKind::Dir,
            Some(_) => EntryKind::Other,
        }
    }

    fn open<'s>(source: &'s mut ArchiveSource) -> Result<zip::ZipArchive<&'s mut ArchiveSource>> {
        zip::ZipArchive::new(source).map_err(|e| map_error(e, None))
    }

    fn raw_entry<R: Read + io::Seek>(
        archive: &mut zip::ZipArchive<R>,
        index: usize,
    ) -> Result<RawEntry> {
        let file = archive.by_index_raw(index).map_err(|e| map_error(e, None))?;
        Ok(RawEntry {
            name: file.name().to_string(),
            size: file.size(),
            modified: file.last_modified().and_then(timestamp::from_zip),
            kind: classify(file.is_dir(), file.unix_mode()),
            encrypted: file.encrypted(),
        })
    }

    pub(super) fn scan(source: &mut ArchiveSource) -> Result<Scan> {
        let mut archive = open(source)?;
        let comment = String::from_utf8_lossy(archive.comment()).into_owned();
        let entries = (0..archive.len())
            .map(|i| raw_entry(&mut archive, i))
            .collect::<Result<Vec<_>>>()?;
        Ok(Scan { entries, comment })
    }

    pub(super) fn stream(
        source: &mut ArchiveSource,
        password: Option<&Password>,
        select: &mut Select<'_>,
        visit: &mut Visitor<'_>,
    ) -> Result<()> {
        let mut archive = open(source)?;
        for index in 0..archive.len() {
            let entry = raw_entry(&mut archive, index)?;
            if !select(index, &entry) {
                continue;
            }
            let flow = if entry.kind == EntryKind::File {
                let opened = match password {
                    Some(p) if entry.encrypted => archive.by_index_decrypt(index, p.as_bytes()),
                    _ => archive.by_index(index),
                };
                let mut file = opened.map_err(|e| map_error(e, Some(&entry.name)))?;
                visit(&entry, &mut file).map_err(|e| password_aware(e, &entry))?
            } else {
                visit(&entry, &mut io::empty())?
            };
            if flow == Flow::Stop {
                break;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn classify_modes() {
            assert_eq!(classify(true, None), EntryKind::Dir);
            assert_eq!(classify(false, None), EntryKind::File);
            assert_eq!(classify(false, Some(0o100644)), EntryKind::File);
            assert_eq!(classify(false, Some(0o120777)), EntryKind::Other);
            assert_eq!(classify(false, Some(0o020644)), EntryKind::Other);
        }

        #[test]
        fn password_errors_mapped() {
            assert!(matches!(
                map_error(ZipError::InvalidPassword, Some("a")),
                Error::WrongPassword { entry: Some(_) }
            ));
            assert!(matches!(
                map_error(ZipError::UnsupportedArchive(ZipError::PASSWORD_REQUIRED), None),
                Error::PasswordRequired
            ));
            assert!(map_error(ZipError::FileNotFound, Some("x")).is_not_found());
        }
    }
}

#[cfg(feature = "tar")]
mod tar_backend {
    use super::*;
    use crate::container::kind::Codec;
    use crate::timestamp;

    fn reader<'s>(codec: Option<Codec>, source: &'s mut ArchiveSource) -> Result<Box<dyn Read + 's>> {
        match codec {
            None => Ok(Box::new(source)),
            Some(codec) => codec.decoder(source),
        }
    }

    fn classify(entry_type: tar::EntryType) -> EntryKind {
        if entry_type.is_dir() {
            EntryKind::Dir
        } else if entry_type.is_file() || entry_type == tar::EntryType::GNUSparse {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    fn is_metadata(entry_type: tar::EntryType) -> bool {
        entry_type.is_pax_global_extensions()
            || entry_type.is_pax_local_extensions()
            || entry_type.is_gnu_longname()
            || entry_type.is_gnu_longlink()
    }

    pub(super) fn stream(
        codec: Option<Codec>,
        source: &mut ArchiveSource,
        select: &mut Select<'_>,
        visit: &mut Visitor<'_>,
    ) -> Result<()> {
        let mut archive = tar::Archive::new(reader(codec, source)?);
        let mut ordinal = 0usize;
        for item in archive.entries()? {
            let mut entry = item?;
            let header = entry.header();
            let entry_type = header.entry_type();
            if is_metadata(entry_type) {
                continue;
            }
            let modified = header
                .mtime()
                .ok()
                .and_then(|secs| timestamp::from_unix_secs(secs as i64));
            let raw = RawEntry {
                name: String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
                size: entry.size(),
                modified,
                kind: classify(entry_type),
                encrypted: false,
            };
            ordinal += 1;
            if !select(ordinal - 1, &raw) {
                continue;
            }
            if visit(&raw, &mut entry)? == Flow::Stop {
                break;
            }
        }
        Ok(())
    }
}
