//! Volume set preparation for the native RAR library.
//!
//! UnRAR opens archives by path and finds continuation volumes itself by
//! name, next to the first one. Sources already laid out that way on local
//! disk are used in place; anything else is copied once into a temporary
//! directory under canonical names.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::source::ArchiveSource;
use crate::tool::MultipartDescriptor;
use crate::tool::registry::MultipartMatch;
use crate::{Error, Result};

/// Suffix of the first volume of a new-style multi-volume set.
pub(crate) const FIRST_VOLUME: &str = ".part1.rar";

/// Naming of the volumes after the first.
pub(crate) const CONTINUATION: MultipartDescriptor = MultipartDescriptor::new(".part{}.rar", 2);

const STAGED_STEM: &str = "volume";

fn naming(stem: &str) -> MultipartMatch {
    MultipartMatch {
        stem: stem.to_string(),
        first_suffix: FIRST_VOLUME,
        descriptor: CONTINUATION,
    }
}

/// Names the `count` volumes of a set whose first file is `first`.
///
/// Returns `None` when `first` does not carry the first-volume suffix.
pub(crate) fn expected_names(first: &str, count: usize) -> Option<Vec<String>> {
    if count == 1 {
        return Some(vec![first.to_string()]);
    }
    let lower = first.to_ascii_lowercase();
    if !lower.ends_with(FIRST_VOLUME) || lower.len() == FIRST_VOLUME.len() {
        return None;
    }
    let stem = &first[..first.len() - FIRST_VOLUME.len()];
    Some(naming(stem).volume_names(count))
}

/// Canonical names used when volumes are staged.
pub(crate) fn staged_names(count: usize) -> Vec<String> {
    if count == 1 {
        vec![format!("{STAGED_STEM}.rar")]
    } else {
        naming(STAGED_STEM).volume_names(count)
    }
}

/// The first volume's path, plus the staging directory keeping it alive.
#[derive(Debug)]
pub(crate) struct VolumeSet {
    first: PathBuf,
    _staging: Option<TempDir>,
}

impl VolumeSet {
    /// Makes `sources` openable by path, staging them if necessary.
    pub(crate) fn prepare(sources: &mut [ArchiveSource]) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::InvalidFormat("no archive source supplied".into()));
        }
        if let Some(first) = co_located(sources) {
            log::debug!("using RAR volumes in place at '{}'", first.display());
            return Ok(Self {
                first,
                _staging: None,
            });
        }

        let staging = tempfile::tempdir()?;
        let names = staged_names(sources.len());
        for (source, name) in sources.iter_mut().zip(&names) {
            let dest = staging.path().join(name);
            log::debug!("staging RAR volume '{}' as '{}'", source.name(), dest.display());
            let mut out = BufWriter::new(File::create(&dest)?);
            source.copy_to(&mut out)?;
            out.into_inner().map_err(|e| e.into_error())?;
        }
        Ok(Self {
            first: staging.path().join(&names[0]),
            _staging: Some(staging),
        })
    }

    /// Returns the path of the first volume.
    pub(crate) fn first(&self) -> &Path {
        &self.first
    }
}

/// Returns the first volume's path if every volume sits next to it under
/// the name UnRAR will look for.
fn co_located(sources: &[ArchiveSource]) -> Option<PathBuf> {
    let first = sources[0].local_path()?;
    let dir = first.parent()?;
    let first_name = first.file_name()?.to_str()?;
    let names = expected_names(first_name, sources.len())?;

    let all_match = sources.iter().zip(&names).all(|(source, name)| {
        source.local_path().is_some_and(|p| {
            p.parent() == Some(dir) && p.file_name().and_then(|n| n.to_str()) == Some(name.as_str())
        })
    });
    all_match.then(|| first.to_path_buf())
}
