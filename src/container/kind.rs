//! Container kind detection from file names and magic bytes.

use std::io::Read;
use std::sync::LazyLock;

use crate::source::ArchiveSource;
use crate::{Error, Result};

/// Stream codec wrapping a container or a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// gzip (RFC 1952), possibly multi-member.
    #[cfg(feature = "gzip")]
    Gzip,
    /// bzip2.
    #[cfg(feature = "bzip2")]
    Bzip2,
    /// xz / LZMA2.
    #[cfg(feature = "xz")]
    Xz,
    /// Zstandard.
    #[cfg(feature = "zstd")]
    Zstd,
    /// Brotli (RFC 7932). The format has no magic bytes.
    #[cfg(feature = "brotli")]
    Brotli,
    /// LZ4 frame format.
    #[cfg(feature = "lz4")]
    Lz4,
    /// zlib (RFC 1950).
    #[cfg(feature = "zlib")]
    Zlib,
    /// Snappy framing format.
    #[cfg(feature = "snappy")]
    Snappy,
    /// lzip, first member only.
    #[cfg(feature = "lzip")]
    Lzip,
}

impl Codec {
    /// Leading magic bytes of the compressed stream, for codecs that have
    /// a signature strong enough to tell a stream apart from plain data.
    fn magic(self) -> Option<&'static [u8]> {
        match self {
            #[cfg(feature = "gzip")]
            Codec::Gzip => Some(&[0x1F, 0x8B]),
            #[cfg(feature = "bzip2")]
            Codec::Bzip2 => Some(b"BZh"),
            #[cfg(feature = "xz")]
            Codec::Xz => Some(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]),
            #[cfg(feature = "zstd")]
            Codec::Zstd => Some(&[0x28, 0xB5, 0x2F, 0xFD]),
            #[cfg(feature = "brotli")]
            Codec::Brotli => None,
            #[cfg(feature = "lz4")]
            Codec::Lz4 => Some(&[0x04, 0x22, 0x4D, 0x18]),
            #[cfg(feature = "zlib")]
            Codec::Zlib => None,
            #[cfg(feature = "snappy")]
            Codec::Snappy => Some(b"\xff\x06\x00\x00sNaPpY"),
            #[cfg(feature = "lzip")]
            Codec::Lzip => Some(b"LZIP"),
        }
    }

    /// Returns true when `head` can start a stream of this codec.
    fn accepts(self, head: &[u8]) -> bool {
        match self {
            #[cfg(feature = "zlib")]
            Codec::Zlib => is_zlib_header(head),
            _ => self.magic().is_none_or(|magic| head.starts_with(magic)),
        }
    }

    /// Returns a human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            #[cfg(feature = "gzip")]
            Codec::Gzip => "gzip",
            #[cfg(feature = "bzip2")]
            Codec::Bzip2 => "bzip2",
            #[cfg(feature = "xz")]
            Codec::Xz => "xz",
            #[cfg(feature = "zstd")]
            Codec::Zstd => "zstd",
            #[cfg(feature = "brotli")]
            Codec::Brotli => "brotli",
            #[cfg(feature = "lz4")]
            Codec::Lz4 => "lz4",
            #[cfg(feature = "zlib")]
            Codec::Zlib => "zlib",
            #[cfg(feature = "snappy")]
            Codec::Snappy => "snappy",
            #[cfg(feature = "lzip")]
            Codec::Lzip => "lzip",
        }
    }

    /// Wraps `reader` in a decoder for this codec.
    pub(crate) fn decoder<'r, R: Read + 'r>(self, reader: R) -> Result<Box<dyn Read + 'r>> {
        Ok(match self {
            #[cfg(feature = "gzip")]
            Codec::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            #[cfg(feature = "bzip2")]
            Codec::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            #[cfg(feature = "xz")]
            Codec::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
            #[cfg(feature = "zstd")]
            Codec::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
            #[cfg(feature = "brotli")]
            Codec::Brotli => Box::new(brotli::Decompressor::new(reader, BROTLI_BUFFER_SIZE)),
            #[cfg(feature = "lz4")]
            Codec::Lz4 => Box::new(lz4_flex::frame::FrameDecoder::new(reader)),
            #[cfg(feature = "zlib")]
            Codec::Zlib => Box::new(flate2::read::ZlibDecoder::new(reader)),
            #[cfg(feature = "snappy")]
            Codec::Snappy => Box::new(snap::read::FrameDecoder::new(reader)),
            #[cfg(feature = "lzip")]
            Codec::Lzip => super::lzip::decoder(reader)?,
        })
    }
}

#[cfg(feature = "brotli")]
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Checks the two-byte zlib header: deflate method, a window of at most
/// 32 KiB and a valid check value.
#[cfg(feature = "zlib")]
fn is_zlib_header(head: &[u8]) -> bool {
    match head {
        [cmf, flg, ..] => {
            cmf & 0x0F == 8 && cmf >> 4 <= 7 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0
        }
        _ => false,
    }
}

/// Storage layout of a generic container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Zip archive with a central directory.
    #[cfg(feature = "zip")]
    Zip,
    /// Tar archive, optionally wrapped in a codec.
    #[cfg(feature = "tar")]
    Tar(Option<Codec>),
    /// A single compressed file.
    Compressed(Codec),
}

/// Name suffixes and the kind they select. Longest first.
fn suffix_table() -> Vec<(&'static str, ContainerKind)> {
    #[allow(unused_mut)]
    let mut table: Vec<(&'static str, ContainerKind)> = Vec::new();
    #[cfg(feature = "zip")]
    table.push((".zip", ContainerKind::Zip));
    #[cfg(feature = "tar")]
    {
        table.push((".tar", ContainerKind::Tar(None)));
        #[cfg(feature = "gzip")]
        table.extend([
            (".tar.gz", ContainerKind::Tar(Some(Codec::Gzip))),
            (".tgz", ContainerKind::Tar(Some(Codec::Gzip))),
        ]);
        #[cfg(feature = "bzip2")]
        table.extend([
            (".tar.bz2", ContainerKind::Tar(Some(Codec::Bzip2))),
            (".tbz2", ContainerKind::Tar(Some(Codec::Bzip2))),
            (".tbz", ContainerKind::Tar(Some(Codec::Bzip2))),
        ]);
        #[cfg(feature = "xz")]
        table.extend([
            (".tar.xz", ContainerKind::Tar(Some(Codec::Xz))),
            (".txz", ContainerKind::Tar(Some(Codec::Xz))),
        ]);
        #[cfg(feature = "zstd")]
        table.extend([
            (".tar.zst", ContainerKind::Tar(Some(Codec::Zstd))),
            (".tzst", ContainerKind::Tar(Some(Codec::Zstd))),
        ]);
        #[cfg(feature = "brotli")]
        table.push((".tar.br", ContainerKind::Tar(Some(Codec::Brotli))));
        #[cfg(feature = "lz4")]
        table.push((".tar.lz4", ContainerKind::Tar(Some(Codec::Lz4))));
        #[cfg(feature = "snappy")]
        table.push((".tar.sz", ContainerKind::Tar(Some(Codec::Snappy))));
        #[cfg(feature = "lzip")]
        table.extend([
            (".tar.lz", ContainerKind::Tar(Some(Codec::Lzip))),
            (".tlz", ContainerKind::Tar(Some(Codec::Lzip))),
        ]);
    }
    #[cfg(feature = "gzip")]
    table.push((".gz", ContainerKind::Compressed(Codec::Gzip)));
    #[cfg(feature = "bzip2")]
    table.push((".bz2", ContainerKind::Compressed(Codec::Bzip2)));
    #[cfg(feature = "xz")]
    table.push((".xz", ContainerKind::Compressed(Codec::Xz)));
    #[cfg(feature = "zstd")]
    table.push((".zst", ContainerKind::Compressed(Codec::Zstd)));
    #[cfg(feature = "brotli")]
    table.push((".br", ContainerKind::Compressed(Codec::Brotli)));
    #[cfg(feature = "lz4")]
    table.push((".lz4", ContainerKind::Compressed(Codec::Lz4)));
    #[cfg(feature = "zlib")]
    table.push((".zz", ContainerKind::Compressed(Codec::Zlib)));
    #[cfg(feature = "snappy")]
    table.extend([
        (".sz", ContainerKind::Compressed(Codec::Snappy)),
        (".s2", ContainerKind::Compressed(Codec::Snappy)),
    ]);
    #[cfg(feature = "lzip")]
    table.push((".lz", ContainerKind::Compressed(Codec::Lzip)));
    table.sort_by_key(|(suffix, _)| std::cmp::Reverse(suffix.len()));
    table
}

static SUFFIXES: LazyLock<Vec<(&'static str, ContainerKind)>> = LazyLock::new(suffix_table);
static EXTENSIONS: LazyLock<Vec<&'static str>> =
    LazyLock::new(|| SUFFIXES.iter().map(|(s, _)| *s).collect());

/// Every accepted extension for the enabled features.
pub(crate) fn extensions() -> &'static [&'static str] {
    EXTENSIONS.as_slice()
}

impl ContainerKind {
    /// Selects a kind from a file name; the longest matching suffix wins.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.len() > suffix.len() && lower.ends_with(suffix))
            .map(|(_, kind)| *kind)
    }

    /// Returns the codec wrapping the container, if any.
    pub fn codec(self) -> Option<Codec> {
        match self {
            #[cfg(feature = "zip")]
            ContainerKind::Zip => None,
            #[cfg(feature = "tar")]
            ContainerKind::Tar(codec) => codec,
            ContainerKind::Compressed(codec) => Some(codec),
        }
    }

    /// Returns a short description such as `"tar+gzip"`.
    pub fn describe(self) -> String {
        match self {
            #[cfg(feature = "zip")]
            ContainerKind::Zip => "zip".to_string(),
            #[cfg(feature = "tar")]
            ContainerKind::Tar(None) => "tar".to_string(),
            #[cfg(feature = "tar")]
            ContainerKind::Tar(Some(codec)) => format!("tar+{}", codec.name()),
            ContainerKind::Compressed(codec) => codec.name().to_string(),
        }
    }
}

const ZIP_SIGNATURES: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_BLOCK: usize = 512;

/// Returns true when a 512-byte block carries a ustar or GNU tar magic.
#[cfg_attr(not(feature = "tar"), allow(dead_code))]
pub(crate) fn is_tar_header(block: &[u8]) -> bool {
    block.len() >= TAR_MAGIC_OFFSET + 5 && &block[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5] == b"ustar"
}

#[cfg_attr(not(feature = "tar"), allow(dead_code))]
fn sniff_codec(head: &[u8]) -> Option<Codec> {
    let all: &[Codec] = &[
        #[cfg(feature = "gzip")]
        Codec::Gzip,
        #[cfg(feature = "bzip2")]
        Codec::Bzip2,
        #[cfg(feature = "xz")]
        Codec::Xz,
        #[cfg(feature = "zstd")]
        Codec::Zstd,
        #[cfg(feature = "lz4")]
        Codec::Lz4,
        #[cfg(feature = "snappy")]
        Codec::Snappy,
        #[cfg(feature = "lzip")]
        Codec::Lzip,
    ];
    all.iter()
        .copied()
        .find(|c| c.magic().is_some_and(|magic| head.starts_with(magic)))
}

fn mismatch(name: &str, expected: &str) -> Error {
    Error::InvalidFormat(format!("'{name}' does not look like a {expected} file"))
}

/// Determines the container kind of a source from its name and content.
///
/// A bare compressed file whose decompressed prefix is a tar header is
/// promoted to a compressed tar.
pub(crate) fn detect(source: &mut ArchiveSource) -> Result<ContainerKind> {
    let name = source.name().to_string();
    let kind = ContainerKind::from_name(&name).ok_or_else(|| Error::UnsupportedFormat {
        name: name.clone(),
    })?;

    let mut head = [0u8; TAR_BLOCK];
    let n = source.peek(&mut head)?;
    let head = &head[..n];

    let confirmed = match kind {
        #[cfg(feature = "zip")]
        ContainerKind::Zip => {
            if !ZIP_SIGNATURES.iter().any(|sig| head.starts_with(sig)) {
                return Err(mismatch(&name, "zip"));
            }
            kind
        }
        #[cfg(feature = "tar")]
        ContainerKind::Tar(None) => {
            if sniff_codec(head).is_some() || head.starts_with(b"PK") {
                return Err(mismatch(&name, "tar"));
            }
            kind
        }
        #[cfg(feature = "tar")]
        ContainerKind::Tar(Some(codec)) => {
            if !codec.accepts(head) {
                return Err(mismatch(&name, codec.name()));
            }
            kind
        }
        ContainerKind::Compressed(codec) => {
            if !codec.accepts(head) {
                return Err(mismatch(&name, codec.name()));
            }
            promote_tar(source, codec)?
        }
    };
    source.rewind()?;
    log::debug!("'{}' detected as {}", name, confirmed.describe());
    Ok(confirmed)
}

#[cfg(feature = "tar")]
fn promote_tar(source: &mut ArchiveSource, codec: Codec) -> Result<ContainerKind> {
    source.rewind()?;
    let mut block = Vec::with_capacity(TAR_BLOCK);
    codec
        .decoder(&mut *source)?
        .take(TAR_BLOCK as u64)
        .read_to_end(&mut block)
        .map_err(|e| Error::InvalidFormat(format!("{} stream: {e}", codec.name())))?;
    Ok(if is_tar_header(&block) {
        ContainerKind::Tar(Some(codec))
    } else {
        ContainerKind::Compressed(codec)
    })
}

#[cfg(not(feature = "tar"))]
fn promote_tar(_source: &mut ArchiveSource, codec: Codec) -> Result<ContainerKind> {
    Ok(ContainerKind::Compressed(codec))
}

/// Name of the single file inside a bare compressed stream.
pub(crate) fn stem(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    SUFFIXES
        .iter()
        .find(|(suffix, kind)| {
            matches!(kind, ContainerKind::Compressed(_)) && lower.ends_with(suffix)
        })
        .map(|(suffix, _)| name[..name.len() - suffix.len()].to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(feature = "tar", feature = "gzip"))]
    #[test]
    fn longest_suffix() {
        assert_eq!(
            ContainerKind::from_name("a.TAR.GZ"),
            Some(ContainerKind::Tar(Some(Codec::Gzip)))
        );
        assert_eq!(
            ContainerKind::from_name("a.gz"),
            Some(ContainerKind::Compressed(Codec::Gzip))
        );
        assert_eq!(ContainerKind::from_name("a.tgz").map(|k| k.describe()), Some("tar+gzip".into()));
    }

    #[test]
    fn unknown_name() {
        assert_eq!(ContainerKind::from_name("a.txt"), None);
        assert_eq!(ContainerKind::from_name(".zip"), None);
    }

    #[cfg(feature = "zip")]
    #[test]
    fn zip_magic_checked() {
        let mut ok = ArchiveSource::from_bytes("a.zip", b"PK\x05\x06rest".to_vec());
        assert_eq!(detect(&mut ok).unwrap(), ContainerKind::Zip);
        let mut bad = ArchiveSource::from_bytes("a.zip", b"not a zip".to_vec());
        assert!(matches!(detect(&mut bad), Err(Error::InvalidFormat(_))));
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn stem_of_compressed() {
        assert_eq!(stem("notes.txt.gz"), "notes.txt");
        assert_eq!(stem("NOTES.GZ"), "NOTES");
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn zlib_header_check() {
        for head in [[0x78, 0x01], [0x78, 0x5E], [0x78, 0x9C], [0x78, 0xDA], [0x58, 0x85]] {
            assert!(is_zlib_header(&head), "{head:02x?}");
        }
        assert!(!is_zlib_header(&[0x78, 0x9D]));
        assert!(!is_zlib_header(&[0x1F, 0x8B]));
        assert!(!is_zlib_header(&[0x78]));
    }

    #[cfg(all(feature = "tar", feature = "brotli", feature = "lz4", feature = "lzip"))]
    #[test]
    fn newer_codec_suffixes() {
        assert_eq!(
            ContainerKind::from_name("site.tar.br"),
            Some(ContainerKind::Tar(Some(Codec::Brotli)))
        );
        assert_eq!(
            ContainerKind::from_name("dump.LZ4"),
            Some(ContainerKind::Compressed(Codec::Lz4))
        );
        assert_eq!(
            ContainerKind::from_name("src.tar.lz"),
            Some(ContainerKind::Tar(Some(Codec::Lzip)))
        );
        assert_eq!(stem("notes.txt.lz"), "notes.txt");
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn brotli_without_magic_is_accepted() {
        assert!(Codec::Brotli.accepts(b"\x8b\x05\x80hello"));
        assert!(Codec::Brotli.magic().is_none());
    }

    #[cfg(all(feature = "tar", feature = "lz4"))]
    #[test]
    fn plain_tar_with_codec_magic_is_rejected() {
        let mut lz4 = ArchiveSource::from_bytes("a.tar", vec![0x04, 0x22, 0x4D, 0x18, 0, 0]);
        assert!(matches!(detect(&mut lz4), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn tar_header_magic() {
        let mut block = vec![0u8; 512];
        assert!(!is_tar_header(&block));
        block[257..262].copy_from_slice(b"ustar");
        assert!(is_tar_header(&block));
    }

    #[test]
    fn extension_list_sorted_longest_first() {
        let exts = extensions();
        assert!(exts.windows(2).all(|w| w[0].len() >= w[1].len()));
    }
}
