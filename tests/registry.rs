//! Integration tests for tool selection through the default registry.

use arcwalk::{ArchiveInnerArgs, ArchiveSource, Error, Registry};

#[test]
fn unknown_names_are_unsupported() {
    let registry = Registry::with_defaults();
    for name in ["notes.txt", "archive", "image.dmg"] {
        match registry.resolve(name) {
            Err(Error::UnsupportedFormat { name: n }) => assert_eq!(n, name),
            other => panic!("{name}: {other:?}"),
        }
    }
}

#[test]
fn empty_registry_accepts_nothing() {
    assert!(Registry::new().resolve("a.zip").is_err());
    assert_eq!(Registry::new().tools().count(), 0);
}

#[cfg(all(feature = "tar", feature = "gzip"))]
#[test]
fn compressed_tar_beats_bare_stream() {
    let registry = Registry::with_defaults();
    let resolved = registry.resolve("/var/backups/Home.TAR.GZ").unwrap();
    assert_eq!(resolved.tool.name(), "container");
    assert!(resolved.multipart.is_none());
}

#[cfg(feature = "iso")]
#[test]
fn iso_images_resolve() {
    let registry = Registry::with_defaults();
    assert_eq!(registry.resolve("disc.iso").unwrap().tool.name(), "iso");
    assert!(registry.get("iso").is_some());
}

#[cfg(feature = "rar")]
mod rar {
    use super::*;

    #[test]
    fn first_volume_names_its_continuations() {
        let registry = Registry::with_defaults();
        let resolved = registry.resolve("Movie.part1.rar").unwrap();
        assert_eq!(resolved.tool.name(), "rar");

        let parts = resolved.multipart.expect("multipart match");
        assert_eq!(
            parts.volume_names(3),
            vec!["Movie.part1.rar", "Movie.part2.rar", "Movie.part3.rar"]
        );
    }

    #[test]
    fn plain_rar_is_single_volume() {
        let resolved = Registry::with_defaults().resolve("single.rar").unwrap();
        assert_eq!(resolved.tool.name(), "rar");
        assert!(resolved.multipart.is_none());
    }

    #[test]
    fn listing_is_refused_not_emulated() {
        let tool = Registry::with_defaults().get("rar").unwrap();
        assert!(!tool.capabilities().list);

        let mut sources = vec![ArchiveSource::from_bytes("x.rar", b"Rar!".to_vec())];
        let err = tool
            .list(&mut sources, &ArchiveInnerArgs::root())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotSupported {
                format: "rar",
                operation: "list"
            }
        ));
    }
}
