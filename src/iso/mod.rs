//! ISO9660 adapter.
//!
//! Images are real directory trees, so paths are resolved by walking
//! directory records from the root, one component at a time, and listing
//! only reads the directory that was asked for. File payloads are streamed
//! straight from their extents.
//!
//! Decompressing a directory writes its children directly into the output
//! directory; decompressing a file writes it under its own name.

mod image;

use std::collections::HashSet;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use self::image::{ExtentReader, Image, Record};
use crate::decompress::{create_dir, write_entry, write_entry_tracked};
use crate::model::{ArchiveArgs, ArchiveInnerArgs, ArchiveMeta, Object, TreeNode};
use crate::progress::ProgressTracker;
use crate::sanitize::secure_join;
use crate::source::ArchiveSource;
use crate::tool::{EntryStream, Tool, primary};
use crate::{Error, Result};

static EXTENSIONS: &[&str] = &[".iso"];

/// Adapter for ISO9660 images, with Joliet and Rock Ridge names.
#[derive(Debug, Clone, Default)]
pub struct IsoTool {
    _private: (),
}

impl IsoTool {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_object(record: Record) -> Object {
    Object {
        name: record.name,
        size: record.size,
        modified: record.modified,
        is_folder: record.is_dir,
    }
}

/// One step of a directory decompress.
enum Job {
    Dir(PathBuf),
    File(Record, PathBuf),
}

/// Plans the output of every descendant of `dir`, rooted at `output`.
fn plan<R: Read + Seek>(
    image: &Image,
    reader: &mut R,
    dir: &Record,
    output: &Path,
) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    let mut visited = HashSet::from([dir.location()]);
    let mut pending = vec![(dir.clone(), output.to_path_buf())];

    while let Some((current, dest)) = pending.pop() {
        for child in image.read_dir(reader, &current)? {
            let path = secure_join(&dest, &child.name)?;
            if child.is_dir {
                if !visited.insert(child.location()) {
                    return Err(Error::CorruptHeader {
                        offset: child.location(),
                        reason: format!("directory '{}' loops back to an ancestor", child.name),
                    });
                }
                jobs.push(Job::Dir(path.clone()));
                pending.push((child, path));
            } else {
                jobs.push(Job::File(child, path));
            }
        }
    }
    Ok(jobs)
}

impl Tool for IsoTool {
    fn name(&self) -> &'static str {
        "iso"
    }

    fn accepted_extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn get_meta(&self, sources: &mut [ArchiveSource], _args: &ArchiveArgs) -> Result<ArchiveMeta> {
        let source = primary(sources)?;
        let image = Image::open(source)?;
        let tree = image
            .read_dir(source, image.root())?
            .into_iter()
            .map(|r| TreeNode::from(to_object(r)))
            .collect();
        Ok(ArchiveMeta {
            comment: String::new(),
            encrypted: false,
            tree,
        })
    }

    fn list(&self, sources: &mut [ArchiveSource], args: &ArchiveInnerArgs) -> Result<Vec<Object>> {
        let source = primary(sources)?;
        let image = Image::open(source)?;
        let inner = args.normalized();
        let dir = image.resolve(source, &inner)?;
        if !dir.is_dir {
            return Err(Error::not_found(inner));
        }
        Ok(image
            .read_dir(source, &dir)?
            .into_iter()
            .map(to_object)
            .collect())
    }

    fn extract<'a>(
        &self,
        sources: &'a mut [ArchiveSource],
        args: &ArchiveInnerArgs,
    ) -> Result<EntryStream<'a>> {
        let source = primary(sources)?;
        let image = Image::open(source)?;
        let inner = args.normalized();
        let file = image.resolve(source, &inner)?;
        if file.is_dir {
            return Err(Error::not_found(inner));
        }
        let size = file.size;
        Ok(EntryStream::new(ExtentReader::new(source, &file), size))
    }

    fn decompress(
        &self,
        sources: &mut [ArchiveSource],
        output: &Path,
        args: &ArchiveInnerArgs,
        progress: &mut dyn FnMut(f64),
    ) -> Result<()> {
        let source = primary(sources)?;
        let image = Image::open(source)?;
        let target = image.resolve(source, &args.normalized())?;
        let mut tracker = ProgressTracker::new(progress);

        if target.is_dir {
            create_dir(output)?;
            let jobs = plan(&image, source, &target, output)?;
            let total = jobs.iter().filter(|j| matches!(j, Job::File(..))).count() as u64;
            let mut done = 0u64;
            for job in jobs {
                match job {
                    Job::Dir(path) => create_dir(&path)?,
                    Job::File(record, dest) => {
                        let mut reader = ExtentReader::new(&mut *source, &record);
                        write_entry(&mut reader, &dest, record.modified)?;
                        done += 1;
                        tracker.report_fraction(done, total);
                    }
                }
            }
        } else {
            let dest = secure_join(output, &target.name)?;
            let reader = ExtentReader::new(&mut *source, &target);
            write_entry_tracked(reader, &dest, target.size, target.modified, &mut tracker)?;
        }
        tracker.finish();
        Ok(())
    }
}
