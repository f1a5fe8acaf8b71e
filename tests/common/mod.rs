//! Shared test utilities for integration tests.
//!
//! Fixture archives are built in memory so no binary test data is checked in.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use arcwalk::{ArchiveSource, Registry, Tool};

/// Resolves `name` through the default registry and wraps `bytes` as its only source.
pub fn open_bytes(name: &str, bytes: Vec<u8>) -> (std::sync::Arc<dyn Tool>, Vec<ArchiveSource>) {
    let tool = Registry::with_defaults().resolve(name).unwrap().tool;
    (tool, vec![ArchiveSource::from_bytes(name, bytes)])
}

/// Reads a whole file under `root`, panicking with the path on failure.
pub fn read_file(root: &Path, rel: &str) -> Vec<u8> {
    let path = root.join(rel);
    let mut data = Vec::new();
    std::fs::File::open(&path)
        .unwrap_or_else(|e| panic!("open {}: {e}", path.display()))
        .read_to_end(&mut data)
        .unwrap();
    data
}

/// Lists every path below `root` as sorted slash-separated strings.
/// Directories carry a trailing slash.
pub fn tree_of(root: &Path) -> Vec<String> {
    fn visit(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let rel = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            if path.is_dir() {
                out.push(format!("{rel}/"));
                visit(root, &path, out);
            } else {
                out.push(rel);
            }
        }
    }
    let mut out = Vec::new();
    visit(root, root, &mut out);
    out.sort();
    out
}

/// Creates a zip archive. Names ending in `/` become directory entries.
#[cfg(feature = "zip")]
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_with(&plain(entries, false), None, "")
}

/// Creates a zip archive whose file entries are AES-256 encrypted.
#[cfg(feature = "zip")]
pub fn encrypted_zip_bytes(entries: &[(&str, &[u8])], password: &str) -> Vec<u8> {
    zip_with(&plain(entries, true), Some(password), "")
}

/// Creates a zip archive where only the entries flagged `true` are
/// AES-256 encrypted with `password`.
#[cfg(feature = "zip")]
pub fn mixed_zip_bytes(entries: &[(&str, &[u8], bool)], password: &str) -> Vec<u8> {
    zip_with(entries, Some(password), "")
}

/// Creates a zip archive carrying an archive comment.
#[cfg(feature = "zip")]
pub fn zip_with_comment(entries: &[(&str, &[u8])], comment: &str) -> Vec<u8> {
    zip_with(&plain(entries, false), None, comment)
}

#[cfg(feature = "zip")]
fn plain<'a>(entries: &[(&'a str, &'a [u8])], encrypted: bool) -> Vec<(&'a str, &'a [u8], bool)> {
    entries.iter().map(|(n, d)| (*n, *d, encrypted)).collect()
}

#[cfg(feature = "zip")]
fn zip_with(entries: &[(&str, &[u8], bool)], password: Option<&str>, comment: &str) -> Vec<u8> {
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let base = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, data, encrypted) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, base).unwrap();
            continue;
        }
        let options = match password {
            Some(pwd) if *encrypted => base.with_aes_encryption(zip::AesMode::Aes256, pwd),
            _ => base,
        };
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    if !comment.is_empty() {
        writer.set_comment(comment);
    }
    writer.finish().unwrap().into_inner()
}

/// Kind of a raw tar fixture entry.
#[cfg(feature = "tar")]
#[derive(Clone, Copy)]
pub enum TarKind {
    File,
    Dir,
    Symlink(&'static str),
}

/// Creates a tar archive. Names are written verbatim into the header, so
/// hostile names like `../x` or `/etc/passwd` survive.
#[cfg(feature = "tar")]
pub fn tar_bytes(entries: &[(&str, TarKind, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, kind, data) in entries {
        let mut header = tar::Header::new_ustar();
        let raw = header.as_mut_bytes();
        raw[..name.len()].copy_from_slice(name.as_bytes());
        header.set_mtime(1_700_000_000);
        match kind {
            TarKind::File => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(data.len() as u64);
            }
            TarKind::Dir => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
            }
            TarKind::Symlink(target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_mode(0o777);
                header.set_size(0);
                header.set_link_name(target).unwrap();
            }
        }
        header.set_cksum();
        let payload: &[u8] = if matches!(kind, TarKind::File) { data } else { &[] };
        builder.append(&header, payload).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Creates a tar archive of plain files and directories (names ending in `/`).
#[cfg(feature = "tar")]
pub fn simple_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let typed: Vec<(&str, TarKind, &[u8])> = entries
        .iter()
        .map(|(name, data)| {
            let kind = if name.ends_with('/') {
                TarKind::Dir
            } else {
                TarKind::File
            };
            (*name, kind, *data)
        })
        .collect();
    tar_bytes(&typed)
}

/// Gzip-compresses `data`.
#[cfg(feature = "gzip")]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

const SECTOR: usize = 2048;
const FIRST_FREE_SECTOR: usize = 18;

/// Minimal ISO9660 image writer: one primary volume descriptor, no Joliet,
/// each directory in a single sector.
#[derive(Default)]
pub struct IsoBuilder {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

impl IsoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an (empty) directory and its parents.
    pub fn dir(mut self, path: &str) -> Self {
        self.add_parents(&format!("{path}/x"));
        self
    }

    /// Adds a file, creating parent directories as needed.
    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.add_parents(path);
        self.files.insert(path.to_string(), data.to_vec());
        self
    }

    fn add_parents(&mut self, path: &str) {
        let mut current = parent(path);
        while !current.is_empty() {
            self.dirs.insert(current.to_string());
            current = parent(current);
        }
    }

    pub fn build(self) -> Vec<u8> {
        let mut next = FIRST_FREE_SECTOR;
        let mut dir_lba: BTreeMap<&str, usize> = BTreeMap::new();
        dir_lba.insert("", next);
        next += 1;
        for dir in &self.dirs {
            dir_lba.insert(dir, next);
            next += 1;
        }
        let mut file_lba: BTreeMap<&str, usize> = BTreeMap::new();
        for (path, data) in &self.files {
            file_lba.insert(path, next);
            next += data.len().div_ceil(SECTOR).max(1);
        }

        let mut image = vec![0u8; next * SECTOR];

        let pvd = &mut image[16 * SECTOR..17 * SECTOR];
        pvd[0] = 1;
        pvd[1..6].copy_from_slice(b"CD001");
        pvd[6] = 1;
        pvd[128..130].copy_from_slice(&(SECTOR as u16).to_le_bytes());
        pvd[130..132].copy_from_slice(&(SECTOR as u16).to_be_bytes());
        let root = record(&[0], dir_lba[""], SECTOR, true);
        pvd[156..156 + root.len()].copy_from_slice(&root);

        let term = &mut image[17 * SECTOR..18 * SECTOR];
        term[0] = 255;
        term[1..6].copy_from_slice(b"CD001");
        term[6] = 1;

        for (&dir, &lba) in &dir_lba {
            let parent_lba = if dir.is_empty() { lba } else { dir_lba[parent(dir)] };
            let mut content = record(&[0], lba, SECTOR, true);
            content.extend(record(&[1], parent_lba, SECTOR, true));
            for sub in self.dirs.iter().filter(|d| parent(d) == dir) {
                content.extend(record(file_name(sub).as_bytes(), dir_lba[sub.as_str()], SECTOR, true));
            }
            for (path, data) in self.files.iter().filter(|(p, _)| parent(p) == dir) {
                let ident = format!("{};1", file_name(path));
                content.extend(record(ident.as_bytes(), file_lba[path.as_str()], data.len(), false));
            }
            assert!(content.len() <= SECTOR, "fixture directory too large");
            image[lba * SECTOR..lba * SECTOR + content.len()].copy_from_slice(&content);
        }

        for (path, data) in &self.files {
            let at = file_lba[path.as_str()] * SECTOR;
            image[at..at + data.len()].copy_from_slice(data);
        }
        image
    }
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(p, _)| p)
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, n)| n)
}

/// Encodes one directory record, dated 2024-01-02 03:04:05 UTC.
fn record(ident: &[u8], lba: usize, len: usize, is_dir: bool) -> Vec<u8> {
    let pad = usize::from(ident.len() % 2 == 0);
    let total = 33 + ident.len() + pad;
    let mut rec = vec![0u8; total];
    rec[0] = total as u8;
    rec[2..6].copy_from_slice(&(lba as u32).to_le_bytes());
    rec[6..10].copy_from_slice(&(lba as u32).to_be_bytes());
    rec[10..14].copy_from_slice(&(len as u32).to_le_bytes());
    rec[14..18].copy_from_slice(&(len as u32).to_be_bytes());
    rec[18..25].copy_from_slice(&[124, 1, 2, 3, 4, 5, 0]);
    rec[25] = if is_dir { 0x02 } else { 0 };
    rec[28..30].copy_from_slice(&1u16.to_le_bytes());
    rec[30..32].copy_from_slice(&1u16.to_be_bytes());
    rec[32] = ident.len() as u8;
    rec[33..33 + ident.len()].copy_from_slice(ident);
    rec
}

/// 2024-01-02 03:04:06 as a packed DOS timestamp, stamped on every RAR
/// fixture entry.
#[cfg(feature = "rar")]
pub const RAR_DOS_TIME: u32 = (((2024 - 1980) << 9 | 1 << 5 | 2) << 16) | (3 << 11 | 4 << 5 | 3);

#[cfg(feature = "rar")]
const RAR_MARKER: &[u8] = b"Rar!\x1a\x07\x00";

#[cfg(feature = "rar")]
#[derive(Clone)]
struct RarEntry {
    name: String,
    data: Vec<u8>,
    attr: u32,
    dir: bool,
}

/// Minimal RAR 4.x writer: stored (method 0x30) entries only, no
/// compression, no encryption.
#[cfg(feature = "rar")]
pub struct RarBuilder {
    host_os: u8,
    entries: Vec<RarEntry>,
}

#[cfg(feature = "rar")]
impl RarBuilder {
    const HOST_WIN32: u8 = 2;
    const HOST_UNIX: u8 = 3;

    /// Starts an archive as written on a unix host.
    pub fn new() -> Self {
        Self {
            host_os: Self::HOST_UNIX,
            entries: Vec::new(),
        }
    }

    /// Starts an archive as written on Windows; attributes are DOS bits.
    pub fn windows() -> Self {
        Self {
            host_os: Self::HOST_WIN32,
            entries: Vec::new(),
        }
    }

    fn default_attr(&self, dir: bool) -> u32 {
        match (self.host_os == Self::HOST_UNIX, dir) {
            (true, true) => 0o040755,
            (true, false) => 0o100644,
            (false, true) => 0x10,
            (false, false) => 0x20,
        }
    }

    pub fn dir(mut self, name: &str) -> Self {
        let attr = self.default_attr(true);
        self.entries.push(RarEntry {
            name: name.to_string(),
            data: Vec::new(),
            attr,
            dir: true,
        });
        self
    }

    pub fn file(self, name: &str, data: &[u8]) -> Self {
        let attr = self.default_attr(false);
        self.file_with_attr(name, data, attr)
    }

    /// Adds a file entry with a raw attribute word.
    pub fn file_with_attr(mut self, name: &str, data: &[u8], attr: u32) -> Self {
        self.entries.push(RarEntry {
            name: name.to_string(),
            data: data.to_vec(),
            attr,
            dir: false,
        });
        self
    }

    /// Adds a unix symbolic link pointing at `target`.
    pub fn symlink(self, name: &str, target: &str) -> Self {
        self.file_with_attr(name, target.as_bytes(), 0o120777)
    }

    /// Writes a single-volume archive.
    pub fn build(&self) -> Vec<u8> {
        let mut out = RAR_MARKER.to_vec();
        out.extend(rar_block(0x73, 0, &[0; 6]));
        for entry in &self.entries {
            out.extend(self.file_block(entry, &entry.data, 0, crc32fast::hash(&entry.data)));
            out.extend_from_slice(&entry.data);
        }
        out.extend(rar_block(0x7B, 0, &[]));
        out
    }

    /// Writes a two-volume set named `.part1.rar`/`.part2.rar`. The last
    /// entry must be a file; its first `head` bytes end the first volume
    /// and the rest fills the second.
    pub fn build_split(&self, head: usize) -> [Vec<u8>; 2] {
        const MHD_VOLUME: u16 = 0x0001;
        const MHD_NEWNUMBERING: u16 = 0x0010;
        const MHD_FIRSTVOLUME: u16 = 0x0100;
        const LHD_SPLIT_BEFORE: u16 = 0x0001;
        const LHD_SPLIT_AFTER: u16 = 0x0002;
        const EARC_NEXT_VOLUME: u16 = 0x0001;

        let (last, rest) = self.entries.split_last().expect("split needs an entry");
        assert!(!last.dir, "the split entry must be a file");
        let (first_part, second_part) = last.data.split_at(head);

        let mut one = RAR_MARKER.to_vec();
        one.extend(rar_block(0x73, MHD_VOLUME | MHD_NEWNUMBERING | MHD_FIRSTVOLUME, &[0; 6]));
        for entry in rest {
            one.extend(self.file_block(entry, &entry.data, 0, crc32fast::hash(&entry.data)));
            one.extend_from_slice(&entry.data);
        }
        one.extend(self.file_block(last, first_part, LHD_SPLIT_AFTER, crc32fast::hash(first_part)));
        one.extend_from_slice(first_part);
        one.extend(rar_block(0x7B, EARC_NEXT_VOLUME, &[]));

        let mut two = RAR_MARKER.to_vec();
        two.extend(rar_block(0x73, MHD_VOLUME | MHD_NEWNUMBERING, &[0; 6]));
        two.extend(self.file_block(last, second_part, LHD_SPLIT_BEFORE, crc32fast::hash(&last.data)));
        two.extend_from_slice(second_part);
        two.extend(rar_block(0x7B, 0, &[]));
        [one, two]
    }

    /// File header for `entry` carrying `packed` bytes of its data.
    fn file_block(&self, entry: &RarEntry, packed: &[u8], split: u16, crc: u32) -> Vec<u8> {
        const LHD_LONG_BLOCK: u16 = 0x8000;
        const LHD_DIRECTORY: u16 = 0x00E0;
        const UNP_VER: u8 = 20;
        const METHOD_STORE: u8 = 0x30;

        let name = entry.name.replace('/', "\\");
        let mut flags = LHD_LONG_BLOCK | split;
        if entry.dir {
            flags |= LHD_DIRECTORY;
        }
        let mut body = Vec::new();
        body.extend_from_slice(&(packed.len() as u32).to_le_bytes());
        body.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
        body.push(self.host_os);
        body.extend_from_slice(&crc.to_le_bytes());
        body.extend_from_slice(&RAR_DOS_TIME.to_le_bytes());
        body.push(UNP_VER);
        body.push(METHOD_STORE);
        body.extend_from_slice(&(name.len() as u16).to_le_bytes());
        body.extend_from_slice(&entry.attr.to_le_bytes());
        body.extend_from_slice(name.as_bytes());
        rar_block(0x74, flags, &body)
    }
}

/// One RAR 4.x block: CRC16 (low half of the CRC32 of everything after it),
/// type, flags, size, body.
#[cfg(feature = "rar")]
fn rar_block(head_type: u8, flags: u16, body: &[u8]) -> Vec<u8> {
    let size = (7 + body.len()) as u16;
    let mut header = vec![head_type];
    header.extend_from_slice(&flags.to_le_bytes());
    header.extend_from_slice(&size.to_le_bytes());
    header.extend_from_slice(body);
    let crc = crc32fast::hash(&header) as u16;
    let mut out = crc.to_le_bytes().to_vec();
    out.extend(header);
    out
}
