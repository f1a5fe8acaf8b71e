//! ISO9660 volume and directory record parsing.
//!
//! Only the structures needed to walk the directory hierarchy are decoded:
//! volume descriptors (primary and Joliet supplementary), directory records,
//! and the Rock Ridge `NM` alternate name. Directory extents are read on
//! demand; nothing is cached between calls.

use std::io::{self, Read, Seek, SeekFrom};
use std::time::SystemTime;

use crate::timestamp;
use crate::{Error, Result};

/// Size of a logical sector in bytes.
pub(crate) const SECTOR_SIZE: u64 = 2048;

/// First sector of the volume descriptor set.
const DESCRIPTOR_START: u64 = 16;

/// Upper bound on volume descriptors examined before giving up.
const MAX_DESCRIPTORS: u64 = 64;

/// Largest directory extent read into memory.
///
/// Real directories are a few sectors; a multi-megabyte extent is a
/// damaged or hostile image.
const MAX_DIRECTORY_SIZE: u64 = 16 * 1024 * 1024;

const DESCRIPTOR_PRIMARY: u8 = 1;
const DESCRIPTOR_SUPPLEMENTARY: u8 = 2;
const DESCRIPTOR_TERMINATOR: u8 = 255;
const STANDARD_ID: &[u8; 5] = b"CD001";

/// Joliet escape sequences for UCS-2 levels 1 to 3.
const JOLIET_ESCAPES: [&[u8; 3]; 3] = [b"%/@", b"%/C", b"%/E"];

const FLAG_DIRECTORY: u8 = 0x02;
const FLAG_MULTI_EXTENT: u8 = 0x80;

/// Fixed part of a directory record, before the identifier.
const RECORD_HEADER_LEN: usize = 33;

/// A contiguous run of bytes belonging to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Extent {
    /// Absolute byte offset in the image.
    pub offset: u64,
    /// Length in bytes.
    pub len: u64,
}

/// A decoded directory record.
#[derive(Debug, Clone)]
pub(crate) struct Record {
    pub name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
    pub extents: Vec<Extent>,
}

impl Record {
    /// Offset of the first extent, identifying a directory.
    pub fn location(&self) -> u64 {
        self.extents.first().map_or(0, |e| e.offset)
    }
}

/// A parsed directory record before name and extent merging.
struct RawRecord {
    name: String,
    extent: Extent,
    modified: Option<SystemTime>,
    is_dir: bool,
    more_extents: bool,
}

/// An opened image: the root record and how to decode names below it.
#[derive(Debug, Clone)]
pub(crate) struct Image {
    block_size: u64,
    joliet: bool,
    root: Record,
}

impl Image {
    /// Reads the volume descriptor set.
    ///
    /// The Joliet tree is used when present, otherwise the primary tree.
    pub fn open<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut primary = None;
        let mut joliet = None;
        let mut sector = [0u8; SECTOR_SIZE as usize];

        for index in DESCRIPTOR_START..DESCRIPTOR_START + MAX_DESCRIPTORS {
            let offset = index * SECTOR_SIZE;
            reader.seek(SeekFrom::Start(offset))?;
            if let Err(e) = reader.read_exact(&mut sector) {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    break;
                }
                return Err(e.into());
            }
            if &sector[1..6] != STANDARD_ID {
                return Err(Error::CorruptHeader {
                    offset,
                    reason: "missing CD001 volume descriptor signature".into(),
                });
            }
            match sector[0] {
                DESCRIPTOR_PRIMARY if primary.is_none() => {
                    primary = Some(descriptor_root(&sector, offset, false)?)
                }
                DESCRIPTOR_SUPPLEMENTARY if joliet.is_none() && is_joliet(&sector) => {
                    joliet = Some(descriptor_root(&sector, offset, true)?)
                }
                DESCRIPTOR_TERMINATOR => break,
                _ => {}
            }
        }

        let (block_size, root, is_joliet) = match (joliet, primary) {
            (Some((bs, root)), _) => (bs, root, true),
            (None, Some((bs, root))) => (bs, root, false),
            (None, None) => {
                return Err(Error::InvalidFormat(
                    "no primary volume descriptor found".into(),
                ));
            }
        };
        log::debug!(
            "opened ISO9660 image (block size {}, joliet: {})",
            block_size,
            is_joliet
        );
        Ok(Self {
            block_size,
            joliet: is_joliet,
            root,
        })
    }

    /// Returns the root directory record.
    pub fn root(&self) -> &Record {
        &self.root
    }

    /// Reads the children of directory `dir`, in on-disc order.
    ///
    /// Multi-extent files are merged into one record. Records that cannot
    /// be decoded are skipped with a warning.
    pub fn read_dir<R: Read + Seek>(&self, reader: &mut R, dir: &Record) -> Result<Vec<Record>> {
        if !dir.is_dir {
            return Err(Error::not_found(dir.name.clone()));
        }
        let Some(extent) = dir.extents.first().copied() else {
            return Ok(Vec::new());
        };
        if extent.len > MAX_DIRECTORY_SIZE {
            return Err(Error::CorruptHeader {
                offset: extent.offset,
                reason: format!("directory extent of {} bytes", extent.len),
            });
        }

        let mut data = vec![0u8; extent.len as usize];
        reader.seek(SeekFrom::Start(extent.offset))?;
        reader.read_exact(&mut data)?;

        let mut children: Vec<Record> = Vec::new();
        let mut continuing = false;
        let mut pos = 0usize;
        while pos < data.len() {
            let len = usize::from(data[pos]);
            if len == 0 {
                pos = next_sector(pos);
                continue;
            }
            let Some(bytes) = data.get(pos..pos + len) else {
                log::warn!(
                    "skipping truncated ISO9660 record at offset {}",
                    extent.offset + pos as u64
                );
                pos = next_sector(pos);
                continue;
            };
            pos += len;

            let raw = match self.parse_record(bytes) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(reason) => {
                    log::warn!(
                        "skipping ISO9660 record at offset {}: {}",
                        extent.offset + (pos - len) as u64,
                        reason
                    );
                    continue;
                }
            };

            let extends_previous =
                continuing && children.last().is_some_and(|last| last.name == raw.name);
            continuing = raw.more_extents;
            if extends_previous {
                if let Some(last) = children.last_mut() {
                    last.size += raw.extent.len;
                    last.extents.push(raw.extent);
                }
                continue;
            }
            children.push(Record {
                name: raw.name,
                size: if raw.is_dir { 0 } else { raw.extent.len },
                modified: raw.modified,
                is_dir: raw.is_dir,
                extents: vec![raw.extent],
            });
        }
        Ok(children)
    }

    /// Resolves a normalized inner path by walking from the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when a component is missing or when the
    /// walk would descend through a file.
    pub fn resolve<R: Read + Seek>(&self, reader: &mut R, path: &str) -> Result<Record> {
        let mut current = self.root.clone();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !current.is_dir {
                return Err(Error::not_found(path));
            }
            current = self
                .read_dir(reader, &current)?
                .into_iter()
                .find(|child| child.name == part)
                .ok_or_else(|| Error::not_found(path))?;
        }
        Ok(current)
    }

    /// Decodes one directory record; `None` for the `.` and `..` entries.
    fn parse_record(&self, bytes: &[u8]) -> std::result::Result<Option<RawRecord>, String> {
        if bytes.len() < RECORD_HEADER_LEN {
            return Err(format!("record length {} too short", bytes.len()));
        }
        let name_len = usize::from(bytes[32]);
        let name_end = RECORD_HEADER_LEN + name_len;
        let Some(ident) = bytes.get(RECORD_HEADER_LEN..name_end) else {
            return Err("identifier overruns record".into());
        };
        if ident == [0] || ident == [1] {
            return Ok(None);
        }

        let flags = bytes[25];
        let is_dir = flags & FLAG_DIRECTORY != 0;
        let ext_attr_blocks = u64::from(bytes[1]);
        let block = u64::from(le_u32(bytes, 2)) + ext_attr_blocks;
        let extent = Extent {
            offset: block * self.block_size,
            len: u64::from(le_u32(bytes, 10)),
        };
        let mut date = [0u8; 7];
        date.copy_from_slice(&bytes[18..25]);

        // The system use area starts after the identifier and its padding.
        let system_use = bytes.get(name_end + (1 - name_len % 2)..).unwrap_or(&[]);
        let name = match rock_ridge_name(system_use) {
            Some(name) if !self.joliet => name,
            _ => decode_identifier(ident, self.joliet, is_dir),
        };
        if name.is_empty() || name.contains(['/', '\0']) {
            return Err(format!("unusable name {name:?}"));
        }

        Ok(Some(RawRecord {
            name,
            extent,
            modified: timestamp::from_iso_record(&date),
            is_dir,
            more_extents: flags & FLAG_MULTI_EXTENT != 0,
        }))
    }
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn next_sector(pos: usize) -> usize {
    let sector = SECTOR_SIZE as usize;
    (pos / sector + 1) * sector
}

fn is_joliet(sector: &[u8]) -> bool {
    JOLIET_ESCAPES
        .iter()
        .any(|esc| &sector[88..91] == esc.as_slice())
}

/// Returns the logical block size and root record of a volume descriptor.
fn descriptor_root(sector: &[u8], offset: u64, joliet: bool) -> Result<(u64, Record)> {
    let block_size = u64::from(le_u16(sector, 128));
    if !block_size.is_power_of_two() || !(512..=SECTOR_SIZE).contains(&block_size) {
        return Err(Error::CorruptHeader {
            offset: offset + 128,
            reason: format!("logical block size {block_size}"),
        });
    }
    let root = &sector[156..190];
    let location = u64::from(le_u32(root, 2)) * block_size;
    let size = u64::from(le_u32(root, 10));
    let mut date = [0u8; 7];
    date.copy_from_slice(&root[18..25]);
    log::debug!(
        "{} volume descriptor at {:#x}: root at {:#x}",
        if joliet { "joliet" } else { "primary" },
        offset,
        location
    );
    Ok((
        block_size,
        Record {
            name: String::new(),
            size: 0,
            modified: timestamp::from_iso_record(&date),
            is_dir: true,
            extents: vec![Extent {
                offset: location,
                len: size,
            }],
        },
    ))
}

/// Decodes a file identifier into a display name.
///
/// Joliet identifiers are UCS-2 big-endian. The `;1` version suffix is
/// removed, as is the trailing dot of files without an extension.
fn decode_identifier(ident: &[u8], joliet: bool, is_dir: bool) -> String {
    let mut name = if joliet {
        let units = ident
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect::<String>()
    } else {
        String::from_utf8_lossy(ident).into_owned()
    };
    if !is_dir {
        if let Some(pos) = name.rfind(';') {
            if name[pos + 1..].bytes().all(|b| b.is_ascii_digit()) {
                name.truncate(pos);
            }
        }
        if name.ends_with('.') {
            name.pop();
        }
    }
    name
}

/// Extracts a Rock Ridge alternate name from a system use area.
fn rock_ridge_name(mut area: &[u8]) -> Option<String> {
    let mut name: Vec<u8> = Vec::new();
    let mut found = false;
    while area.len() >= 4 {
        let len = usize::from(area[2]);
        if len < 4 || len > area.len() {
            break;
        }
        let (entry, rest) = area.split_at(len);
        if &entry[..2] == b"NM" && len >= 5 {
            let flags = entry[4];
            // Flags 0x02 and 0x04 name the current and parent directory.
            if flags & 0x06 == 0 {
                name.extend_from_slice(&entry[5..]);
                found = true;
            }
        } else if &entry[..2] == b"ST" {
            break;
        }
        area = rest;
    }
    found.then(|| String::from_utf8_lossy(&name).into_owned())
}

/// Reader over a file's extents, seeking to each in turn.
pub(crate) struct ExtentReader<'r, R> {
    inner: &'r mut R,
    extents: Vec<Extent>,
    current: usize,
    consumed: u64,
    positioned: bool,
}

impl<'r, R: Read + Seek> ExtentReader<'r, R> {
    pub fn new(inner: &'r mut R, record: &Record) -> Self {
        Self {
            inner,
            extents: record.extents.clone(),
            current: 0,
            consumed: 0,
            positioned: false,
        }
    }
}

impl<R: Read + Seek> Read for ExtentReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let Some(extent) = self.extents.get(self.current).copied() else {
                return Ok(0);
            };
            let left = extent.len - self.consumed;
            if left == 0 {
                self.current += 1;
                self.consumed = 0;
                self.positioned = false;
                continue;
            }
            if !self.positioned {
                self.inner
                    .seek(SeekFrom::Start(extent.offset + self.consumed))?;
                self.positioned = true;
            }
            let want = buf.len().min(usize::try_from(left).unwrap_or(usize::MAX));
            let n = self.inner.read(&mut buf[..want])?;
            if n == 0 && want > 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "ISO9660 extent ends past the image",
                ));
            }
            self.consumed += n as u64;
            return Ok(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_decoding() {
        assert_eq!(decode_identifier(b"README.TXT;1", false, false), "README.TXT");
        assert_eq!(decode_identifier(b"MAKEFILE.;1", false, false), "MAKEFILE");
        assert_eq!(decode_identifier(b"DIR.X", false, true), "DIR.X");
        let ucs2: Vec<u8> = "héllo.txt;1"
            .encode_utf16()
            .flat_map(u16::to_be_bytes)
            .collect();
        assert_eq!(decode_identifier(&ucs2, true, false), "héllo.txt");
    }

    #[test]
    fn rock_ridge_names() {
        let mut area = Vec::new();
        area.extend_from_slice(b"PX");
        area.extend_from_slice(&[4, 1]);
        area.extend_from_slice(b"NM");
        area.extend_from_slice(&[5 + 6, 1, 0x01]);
        area.extend_from_slice(b"long_n");
        area.extend_from_slice(b"NM");
        area.extend_from_slice(&[5 + 5, 1, 0]);
        area.extend_from_slice(b"ame.c");
        assert_eq!(rock_ridge_name(&area).as_deref(), Some("long_name.c"));
        assert_eq!(rock_ridge_name(b"PX\x04\x01"), None);
        assert_eq!(rock_ridge_name(&[]), None);
    }

    #[test]
    fn sector_rounding() {
        assert_eq!(next_sector(0), 2048);
        assert_eq!(next_sector(2047), 2048);
        assert_eq!(next_sector(2048), 4096);
    }

    #[test]
    fn extents_are_concatenated() {
        let mut image = io::Cursor::new(b"xxAAAyyBBBzz".to_vec());
        let record = Record {
            name: "f".into(),
            size: 6,
            modified: None,
            is_dir: false,
            extents: vec![Extent { offset: 2, len: 3 }, Extent { offset: 7, len: 3 }],
        };
        let mut out = Vec::new();
        ExtentReader::new(&mut image, &record)
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"AAABBB");
    }

    #[test]
    fn short_image_is_rejected() {
        let mut tiny = io::Cursor::new(vec![0u8; 4096]);
        assert!(Image::open(&mut tiny).is_err());
    }

    #[test]
    fn extent_past_end_fails() {
        let mut image = io::Cursor::new(vec![1u8; 4]);
        let record = Record {
            name: "f".into(),
            size: 10,
            modified: None,
            is_dir: false,
            extents: vec![Extent { offset: 2, len: 10 }],
        };
        let mut out = Vec::new();
        let err = ExtentReader::new(&mut image, &record)
            .read_to_end(&mut out)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
