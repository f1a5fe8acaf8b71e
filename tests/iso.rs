//! Integration tests for ISO9660 images.

#![cfg(feature = "iso")]

mod common;

use std::io::Read;
use std::time::{Duration, UNIX_EPOCH};

use arcwalk::{ArchiveArgs, ArchiveInnerArgs, ArchiveSource, IsoTool, Tool};
use common::{IsoBuilder, read_file, tree_of};
use tempfile::TempDir;

/// 2024-01-02 03:04:05 UTC, the date stamped on every fixture record.
const FIXTURE_TIME: u64 = 1_704_164_645;

fn image() -> Vec<u8> {
    IsoBuilder::new()
        .file("README.TXT", b"hello from the disc")
        .file("DOCS/GUIDE.MD", b"# guide")
        .file("DOCS/DEEP/NOTE.TXT", b"deep note")
        .dir("EMPTY")
        .build()
}

fn sources() -> Vec<ArchiveSource> {
    vec![ArchiveSource::from_bytes("disc.iso", image())]
}

fn sorted_names(objects: &[arcwalk::Object]) -> Vec<&str> {
    let mut names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
    names.sort();
    names
}

#[test]
fn meta_lists_root_children() {
    let meta = IsoTool::new()
        .get_meta(&mut sources(), &ArchiveArgs::new())
        .unwrap();

    assert!(meta.comment.is_empty());
    assert!(!meta.encrypted);
    let mut roots: Vec<(&str, bool)> = meta
        .tree
        .iter()
        .map(|n| (n.name.as_str(), n.is_folder))
        .collect();
    roots.sort();
    assert_eq!(
        roots,
        vec![("DOCS", true), ("EMPTY", true), ("README.TXT", false)]
    );
}

#[test]
fn listing_strips_version_suffixes() {
    let tool = IsoTool::new();
    let mut sources = sources();

    let docs = tool.list(&mut sources, &ArchiveInnerArgs::new("/DOCS")).unwrap();
    assert_eq!(sorted_names(&docs), vec!["DEEP", "GUIDE.MD"]);
    let guide = docs.iter().find(|o| o.name == "GUIDE.MD").unwrap();
    assert_eq!(guide.size, 7);
    assert_eq!(
        guide.modified,
        Some(UNIX_EPOCH + Duration::from_secs(FIXTURE_TIME))
    );

    let empty = tool.list(&mut sources, &ArchiveInnerArgs::new("EMPTY")).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn lookups_fail_cleanly() {
    let tool = IsoTool::new();
    let mut sources = sources();

    for path in ["MISSING", "README.TXT/INNER", "DOCS/NOPE.TXT"] {
        let err = tool
            .list(&mut sources, &ArchiveInnerArgs::new(path))
            .unwrap_err();
        assert!(err.is_not_found(), "{path}: {err:?}");
    }
    let err = tool
        .list(&mut sources, &ArchiveInnerArgs::new("README.TXT"))
        .unwrap_err();
    assert!(err.is_not_found());
    let err = tool
        .extract(&mut sources, &ArchiveInnerArgs::new("DOCS"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn extract_reads_file_extent() {
    let tool = IsoTool::new();
    let mut sources = sources();
    let mut stream = tool
        .extract(&mut sources, &ArchiveInnerArgs::new("DOCS/DEEP/NOTE.TXT"))
        .unwrap();
    assert_eq!(stream.size(), 9);
    let mut data = Vec::new();
    stream.read_to_end(&mut data).unwrap();
    assert_eq!(data, b"deep note");
}

#[test]
fn whole_image_round_trip() {
    let out = TempDir::new().unwrap();
    let mut progress = Vec::new();
    IsoTool::new()
        .decompress(&mut sources(), out.path(), &ArchiveInnerArgs::root(), &mut |p| {
            progress.push(p)
        })
        .unwrap();

    assert_eq!(
        tree_of(out.path()),
        vec![
            "DOCS/",
            "DOCS/DEEP/",
            "DOCS/DEEP/NOTE.TXT",
            "DOCS/GUIDE.MD",
            "EMPTY/",
            "README.TXT",
        ]
    );
    assert_eq!(read_file(out.path(), "README.TXT"), b"hello from the disc");
    assert_eq!(progress.last().copied(), Some(100.0));

    let modified = std::fs::metadata(out.path().join("README.TXT"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(modified, UNIX_EPOCH + Duration::from_secs(FIXTURE_TIME));
}

#[test]
fn directory_contents_land_in_output() {
    let out = TempDir::new().unwrap();
    IsoTool::new()
        .decompress(&mut sources(), out.path(), &ArchiveInnerArgs::new("DOCS"), &mut |_| {})
        .unwrap();
    assert_eq!(
        tree_of(out.path()),
        vec!["DEEP/", "DEEP/NOTE.TXT", "GUIDE.MD"]
    );
}

#[test]
fn single_file_lands_under_base_name() {
    let out = TempDir::new().unwrap();
    IsoTool::new()
        .decompress(
            &mut sources(),
            out.path(),
            &ArchiveInnerArgs::new("DOCS/DEEP/NOTE.TXT"),
            &mut |_| {},
        )
        .unwrap();
    assert_eq!(tree_of(out.path()), vec!["NOTE.TXT"]);
}

#[test]
fn existing_file_is_kept() {
    let out = TempDir::new().unwrap();
    std::fs::write(out.path().join("README.TXT"), b"mine").unwrap();
    let err = IsoTool::new()
        .decompress(&mut sources(), out.path(), &ArchiveInnerArgs::root(), &mut |_| {})
        .unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(read_file(out.path(), "README.TXT"), b"mine");
}

#[test]
fn non_iso_data_is_rejected() {
    let mut sources = vec![ArchiveSource::from_bytes("junk.iso", vec![0x5a; 40 * 2048])];
    assert!(
        IsoTool::new()
            .get_meta(&mut sources, &ArchiveArgs::new())
            .is_err()
    );

    let mut tiny = vec![ArchiveSource::from_bytes("tiny.iso", vec![0; 100])];
    assert!(IsoTool::new().get_meta(&mut tiny, &ArchiveArgs::new()).is_err());
}
