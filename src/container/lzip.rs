//! lzip stream decoding on top of the raw LZMA decoder.
//!
//! An lzip member is a 6-byte header, an LZMA stream with an end marker
//! and fixed coder parameters, and a 20-byte trailer. Only the first member
//! is decoded; the trailer is not verified.

use std::io::{self, Read};

const MAGIC: &[u8] = b"LZIP";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 6;
/// lc=3, lp=0, pb=2: `(pb * 5 + lp) * 9 + lc`.
const PROPS: u8 = 93;
/// Size to pass when the stream ends with an end marker.
const UNKNOWN_SIZE: u64 = u64::MAX;

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Decodes the coded dictionary size byte: a power of two in bits 0-4,
/// minus sixteenths of it given by bits 5-7.
pub(crate) fn dict_size(coded: u8) -> io::Result<u32> {
    let exp = u32::from(coded & 0x1F);
    if !(12..=29).contains(&exp) {
        return Err(invalid(format!("lzip dictionary size 2^{exp} out of range")));
    }
    let base = 1u32 << exp;
    Ok(base - (base / 16) * u32::from(coded >> 5))
}

/// Reads the member header from `reader` and returns a decoder for the
/// payload that follows.
pub(crate) fn decoder<'r, R: Read + 'r>(mut reader: R) -> io::Result<Box<dyn Read + 'r>> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    if &header[..4] != MAGIC {
        return Err(invalid("missing lzip magic"));
    }
    if header[4] != VERSION {
        return Err(invalid(format!("unsupported lzip version {}", header[4])));
    }
    let dict = dict_size(header[5])?;
    let lzma = lzma_rust2::LzmaReader::new_with_props(reader, UNKNOWN_SIZE, PROPS, dict, None)
        .map_err(|e| invalid(e.to_string()))?;
    Ok(Box::new(lzma))
}
