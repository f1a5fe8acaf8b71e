//! Host system detection from raw RAR headers.
//!
//! The UnRAR bindings drop the host OS field of a file header, but the
//! meaning of the attribute word depends on it: DOS attribute bits for
//! archives created on Windows, a unix `st_mode` otherwise. The first file
//! header of the first volume is read here directly. Every entry of one
//! archive comes from the same archiver run, so that header speaks for all.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

const RAR4_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x00";
const RAR5_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x01\x00";

const RAR4_MAIN: u8 = 0x73;
const RAR4_FILE: u8 = 0x74;
const RAR4_END: u8 = 0x7B;
const RAR4_LONG_BLOCK: u16 = 0x8000;
const RAR4_ENCRYPTED_HEADERS: u16 = 0x0080;

const RAR5_FILE: u64 = 2;
const RAR5_ENCRYPTION: u64 = 4;
const RAR5_END: u64 = 5;
const RAR5_HAS_EXTRA: u64 = 0x0001;
const RAR5_HAS_DATA: u64 = 0x0002;
const RAR5_FILE_HAS_MTIME: u64 = 0x0002;
const RAR5_FILE_HAS_CRC: u64 = 0x0004;

/// Headers examined before giving up.
const MAX_HEADERS: usize = 64;

/// System an archive was created on, as far as attributes are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Host {
    /// MS-DOS, OS/2 and Windows: DOS attribute bits.
    Windows,
    /// Unix-like systems: `st_mode`.
    Unix,
    /// Headers are encrypted, missing or unreadable.
    Unknown,
}

/// Reads the host system of the archive starting at `path`.
pub(crate) fn detect(path: &Path) -> Host {
    let detected = File::open(path).and_then(|file| read_host(&mut BufReader::new(file)));
    match detected {
        Ok(host) => host,
        Err(e) => {
            log::debug!("no host system for '{}': {}", path.display(), e);
            Host::Unknown
        }
    }
}

fn read_host<R: Read + Seek>(r: &mut R) -> io::Result<Host> {
    let mut signature = [0u8; 8];
    r.read_exact(&mut signature[..7])?;
    if signature[..7] == *RAR4_SIGNATURE {
        return rar4_host(r);
    }
    r.read_exact(&mut signature[7..])?;
    if signature == *RAR5_SIGNATURE {
        return rar5_host(r);
    }
    Ok(Host::Unknown)
}

fn rar4_host<R: Read + Seek>(r: &mut R) -> io::Result<Host> {
    for _ in 0..MAX_HEADERS {
        let start = r.stream_position()?;
        let _crc = read_u16(r)?;
        let head_type = read_u8(r)?;
        let flags = read_u16(r)?;
        let head_size = read_u16(r)? as u64;

        match head_type {
            RAR4_MAIN if flags & RAR4_ENCRYPTED_HEADERS != 0 => return Ok(Host::Unknown),
            RAR4_FILE => {
                let _pack_size = read_u32(r)?;
                let _unpacked_size = read_u32(r)?;
                return Ok(match read_u8(r)? {
                    0..=2 => Host::Windows,
                    3..=5 => Host::Unix,
                    _ => Host::Unknown,
                });
            }
            RAR4_END => return Ok(Host::Unknown),
            _ => {}
        }

        let add_size = if flags & RAR4_LONG_BLOCK != 0 {
            read_u32(r)? as u64
        } else {
            0
        };
        if head_size < 7 {
            return Ok(Host::Unknown);
        }
        r.seek(SeekFrom::Start(start + head_size + add_size))?;
    }
    Ok(Host::Unknown)
}

fn rar5_host<R: Read + Seek>(r: &mut R) -> io::Result<Host> {
    for _ in 0..MAX_HEADERS {
        let _crc = read_u32(r)?;
        let header_size = read_vint(r)?;
        let body = r.stream_position()?;
        let head_type = read_vint(r)?;
        let flags = read_vint(r)?;
        if flags & RAR5_HAS_EXTRA != 0 {
            read_vint(r)?;
        }
        let data_size = if flags & RAR5_HAS_DATA != 0 {
            read_vint(r)?
        } else {
            0
        };

        match head_type {
            RAR5_FILE => {
                let file_flags = read_vint(r)?;
                let _unpacked_size = read_vint(r)?;
                let _attributes = read_vint(r)?;
                if file_flags & RAR5_FILE_HAS_MTIME != 0 {
                    read_u32(r)?;
                }
                if file_flags & RAR5_FILE_HAS_CRC != 0 {
                    read_u32(r)?;
                }
                let _compression = read_vint(r)?;
                return Ok(match read_vint(r)? {
                    0 => Host::Windows,
                    1 => Host::Unix,
                    _ => Host::Unknown,
                });
            }
            RAR5_ENCRYPTION | RAR5_END => return Ok(Host::Unknown),
            _ => {}
        }

        let next = body
            .checked_add(header_size)
            .and_then(|n| n.checked_add(data_size))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "header size overflow"))?;
        r.seek(SeekFrom::Start(next))?;
    }
    Ok(Host::Unknown)
}

/// Reads a RAR5 variable-length integer: seven bits per byte, low bits
/// first, high bit set on every byte but the last.
fn read_vint<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let byte = read_u8(r)?;
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(io::Error::new(io::ErrorKind::InvalidData, "vint longer than 10 bytes"))
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
