//! Error types for archive inspection and extraction.
//!
//! This module provides the [`Error`] enum which represents every failure a
//! caller can observe from an adapter, along with a convenient [`Result<T>`]
//! type alias.
//!
//! # Error Categories
//!
//! | Category | Variants | Caller reaction |
//! |----------|----------|-----------------|
//! | Illegal path | [`IllegalPath`][Error::IllegalPath] | Never coerced; the archive is hostile or broken |
//! | Password | [`PasswordRequired`][Error::PasswordRequired], [`WrongPassword`][Error::WrongPassword] | Re-prompt and retry |
//! | Not found | [`NotFound`][Error::NotFound] | The inner path does not exist |
//! | Not supported | [`NotSupported`][Error::NotSupported], [`UnsupportedFormat`][Error::UnsupportedFormat] | Pick another operation or format |
//! | Format | [`InvalidFormat`][Error::InvalidFormat], [`CorruptHeader`][Error::CorruptHeader] | The archive is damaged |
//! | I/O | [`Io`][Error::Io] | Source or destination failure |
//!
//! # Example
//!
//! ```rust,no_run
//! use arcwalk::{ArchiveArgs, ArchiveSource, Error, Registry};
//!
//! fn show(path: &str, password: Option<&str>) -> arcwalk::Result<()> {
//!     let registry = Registry::with_defaults();
//!     let tool = registry.resolve(path)?.tool;
//!     let mut sources = vec![ArchiveSource::open(path)?];
//!     let args = ArchiveArgs::new().with_password(password.unwrap_or_default());
//!     match tool.get_meta(&mut sources, &args) {
//!         Ok(meta) => println!("{} top-level entries", meta.tree.len()),
//!         Err(e) if e.is_password_error() => eprintln!("password needed: {e}"),
//!         Err(Error::IllegalPath { entry }) => eprintln!("refusing entry {entry:?}"),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```

use std::io;

/// The main error type for archive operations.
///
/// Password failures are deliberately separate from [`Error::Io`] so that a
/// caller can ask the user again instead of reporting corruption.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading the source or writing output.
    ///
    /// Exclusive file creation collisions surface here with
    /// [`io::ErrorKind::AlreadyExists`]; see [`Error::is_already_exists`].
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An archive entry name cannot be mapped safely under the output root.
    ///
    /// Raised by the path sanitizer for traversal, absolute, drive-letter,
    /// UNC and NUL-containing names, and by adapters for entries that are
    /// not regular files (symlinks, devices).
    #[error("archive entry has illegal path: {entry}")]
    IllegalPath {
        /// The offending entry name, exactly as stored in the archive.
        entry: String,
    },

    /// The entry (or archive header) is encrypted and no password was given.
    #[error("password required for encrypted archive")]
    PasswordRequired,

    /// The supplied password does not decrypt the entry.
    #[error("wrong password{}", entry.as_deref().map(|e| format!(" for entry '{e}'")).unwrap_or_default())]
    WrongPassword {
        /// Name of the entry that failed to decrypt, when known.
        entry: Option<String>,
    },

    /// The requested inner path does not resolve to an entry.
    ///
    /// Also returned when a stream is requested for a directory.
    #[error("object not found: {path}")]
    NotFound {
        /// The inner path that was looked up.
        path: String,
    },

    /// The operation is not available for this format's structural model.
    #[error("{operation} is not supported for {format} archives")]
    NotSupported {
        /// Adapter name, e.g. `"rar"`.
        format: &'static str,
        /// Operation name, e.g. `"list"`.
        operation: &'static str,
    },

    /// No registered adapter accepts the given file name.
    #[error("no archive tool accepts '{name}'")]
    UnsupportedFormat {
        /// File name that was resolved.
        name: String,
    },

    /// The archive data does not match the expected format.
    #[error("invalid archive format: {0}")]
    InvalidFormat(String),

    /// A structural header inside the archive is damaged.
    #[error("corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// Byte offset in the source where the problem was detected.
        offset: u64,
        /// Description of the inconsistency.
        reason: String,
    },
}

impl Error {
    /// Creates an [`Error::IllegalPath`] for the given entry name.
    pub fn illegal_path(entry: impl Into<String>) -> Self {
        Self::IllegalPath {
            entry: entry.into(),
        }
    }

    /// Creates an [`Error::NotFound`] for the given inner path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Returns true for missing or incorrect password errors.
    pub fn is_password_error(&self) -> bool {
        matches!(self, Self::PasswordRequired | Self::WrongPassword { .. })
    }

    /// Returns true if the inner path could not be resolved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the sanitizer or an adapter rejected an entry path.
    pub fn is_illegal_path(&self) -> bool {
        matches!(self, Self::IllegalPath { .. })
    }

    /// Returns true if a destination already existed and was not clobbered.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::AlreadyExists)
    }
}

/// A specialized Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;
