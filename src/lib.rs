//! # arcwalk
//!
//! Format-agnostic archive inspection and extraction.
//!
//! Archive formats store their entries in very different ways: zip and tar
//! record flat paths, RAR is a forward-only stream of headers spread over
//! several volumes, and ISO9660 images are real directory trees addressed by
//! sector. This crate puts one contract over all of them:
//!
//! - [`Tool::get_meta`]: comment, encryption flag and entry tree
//! - [`Tool::list`]: immediate children of an inner path
//! - [`Tool::extract`]: stream one entry
//! - [`Tool::decompress`]: extract the whole archive or one subtree to disk
//!
//! Every destination path is derived through [`sanitize::secure_join`], so a
//! crafted entry name can never escape the output directory, and files are
//! created exclusively so existing data is never overwritten.
//!
//! ## Quick Start
//!
//! ### Listing an Archive
//!
//! ```rust,no_run
//! use arcwalk::{ArchiveArgs, ArchiveSource, Registry, Result};
//!
//! fn main() -> Result<()> {
//!     let registry = Registry::with_defaults();
//!     let tool = registry.resolve("photos.zip")?.tool;
//!     let mut sources = vec![ArchiveSource::open("photos.zip")?];
//!
//!     let meta = tool.get_meta(&mut sources, &ArchiveArgs::new())?;
//!     for node in &meta.tree {
//!         println!("{}{}", node.name, if node.is_folder { "/" } else { "" });
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Extracting a Subtree
//!
//! ```rust,no_run
//! use arcwalk::{ArchiveInnerArgs, ArchiveSource, Registry, Result};
//!
//! fn main() -> Result<()> {
//!     let registry = Registry::with_defaults();
//!     let tool = registry.resolve("backup.tar.gz")?.tool;
//!     let mut sources = vec![ArchiveSource::open("backup.tar.gz")?];
//!
//!     let args = ArchiveInnerArgs::new("/home/docs");
//!     tool.decompress(&mut sources, "./restored".as_ref(), &args, &mut |pct| {
//!         println!("{pct:.0}%");
//!     })?;
//!     Ok(())
//! }
//! ```
//!
//! ### Multi-Volume Archives
//!
//! ```rust,no_run
//! # #[cfg(feature = "rar")]
//! # fn main() -> arcwalk::Result<()> {
//! use arcwalk::{ArchiveArgs, ArchiveSource, Registry};
//!
//! let registry = Registry::with_defaults();
//! let resolved = registry.resolve("movie.part1.rar")?;
//! let parts = resolved.multipart.expect("first volume");
//! let mut sources = (0..3)
//!     .map(|i| ArchiveSource::open(parts.volume_name(i)))
//!     .collect::<arcwalk::Result<Vec<_>>>()?;
//!
//! let args = ArchiveArgs::new().with_password("secret");
//! let meta = resolved.tool.get_meta(&mut sources, &args)?;
//! println!("encrypted: {}", meta.encrypted);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "rar"))]
//! # fn main() {}
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `zip` | Yes | Zip archives, including ZipCrypto and AES entries |
//! | `tar` | Yes | Tar archives |
//! | `gzip` | Yes | `.gz` / `.tgz` streams |
//! | `bzip2` | Yes | `.bz2` / `.tbz2` streams |
//! | `xz` | Yes | `.xz` / `.txz` streams |
//! | `zstd` | Yes | `.zst` / `.tzst` streams |
//! | `brotli` | Yes | `.br` / `.tar.br` streams |
//! | `lz4` | Yes | `.lz4` / `.tar.lz4` frame streams |
//! | `zlib` | Yes | `.zz` streams |
//! | `snappy` | Yes | `.sz` / `.s2` framed Snappy streams |
//! | `lzip` | Yes | `.lz` / `.tar.lz` streams |
//! | `rar` | Yes | RAR and multi-volume RAR through the UnRAR library |
//! | `iso` | Yes | ISO9660 images with Joliet and Rock Ridge names |
//! | `cli` | No | Command-line interface tool |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

/// Default buffer size for read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod archive_path;
pub mod error;
pub mod model;
pub mod password;
pub mod progress;
pub mod sanitize;
pub mod source;
pub mod timestamp;
pub mod tool;
pub mod tree;

pub(crate) mod decompress;

#[cfg(any(
    feature = "zip",
    feature = "tar",
    feature = "gzip",
    feature = "bzip2",
    feature = "xz",
    feature = "zstd",
    feature = "brotli",
    feature = "lz4",
    feature = "zlib",
    feature = "snappy",
    feature = "lzip"
))]
#[cfg_attr(
    docsrs,
    doc(cfg(any(
        feature = "zip",
        feature = "tar",
        feature = "gzip",
        feature = "bzip2",
        feature = "xz",
        feature = "zstd",
        feature = "brotli",
        feature = "lz4",
        feature = "zlib",
        feature = "snappy",
        feature = "lzip"
    )))
)]
pub mod container;

#[cfg(feature = "rar")]
#[cfg_attr(docsrs, doc(cfg(feature = "rar")))]
pub mod rar;

#[cfg(feature = "iso")]
#[cfg_attr(docsrs, doc(cfg(feature = "iso")))]
pub mod iso;

pub use error::{Error, Result};
pub use model::{ArchiveArgs, ArchiveInnerArgs, ArchiveMeta, Entry, Object, TreeNode};
pub use password::Password;
pub use source::{ArchiveSource, ReadSeek};
pub use tool::registry::{MultipartMatch, Registry, Resolved};
pub use tool::{Capabilities, EntryStream, MultipartDescriptor, Tool};

#[cfg(any(
    feature = "zip",
    feature = "tar",
    feature = "gzip",
    feature = "bzip2",
    feature = "xz",
    feature = "zstd",
    feature = "brotli",
    feature = "lz4",
    feature = "zlib",
    feature = "snappy",
    feature = "lzip"
))]
pub use container::ContainerTool;
#[cfg(feature = "iso")]
pub use iso::IsoTool;
#[cfg(feature = "rar")]
pub use rar::RarTool;
