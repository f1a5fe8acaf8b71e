//! Seekable, sized byte sources backing an archive.
//!
//! An [`ArchiveSource`] is one physical file of an archive. Single-volume
//! archives use one source; multi-volume sets pass every volume in order.
//! Sources may come from local disk or from any `Read + Seek` stream (for
//! example a remote storage object wrapped by the caller).

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::Result;

/// Object-safe combination of [`Read`] and [`Seek`].
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// One physical file of an archive.
pub struct ArchiveSource {
    name: String,
    size: u64,
    reader: Box<dyn ReadSeek>,
    local_path: Option<PathBuf>,
}

impl ArchiveSource {
    /// Opens a file on local disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self {
            name,
            size,
            reader: Box::new(BufReader::new(file)),
            local_path: Some(path.to_path_buf()),
        })
    }

    /// Wraps an arbitrary seekable stream. The size is found by seeking.
    pub fn from_reader<R>(name: impl Into<String>, mut reader: R) -> Result<Self>
    where
        R: Read + Seek + Send + 'static,
    {
        let size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self {
            name: name.into(),
            size,
            reader: Box::new(reader),
            local_path: None,
        })
    }

    /// Wraps an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            reader: Box::new(Cursor::new(bytes)),
            local_path: None,
        }
    }

    /// Returns the file name of this source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the total size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the on-disk location, when the source was opened from a path.
    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    /// Seeks back to the first byte.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Reads up to `buf.len()` bytes from the start without consuming them.
    pub fn peek(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.rewind()?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.rewind()?;
        Ok(filled)
    }

    /// Copies the whole source into `dest`, streaming from the start.
    pub fn copy_to<W: Write>(&mut self, dest: &mut W) -> Result<u64> {
        self.rewind()?;
        Ok(io::copy(&mut self.reader, dest)?)
    }
}

impl Read for ArchiveSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for ArchiveSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}

impl std::fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSource")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("local_path", &self.local_path)
            .finish_non_exhaustive()
    }
}
