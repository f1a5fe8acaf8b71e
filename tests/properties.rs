//! Property-based tests using proptest.
//!
//! These tests check the destination-path guarantees and tree inference
//! against randomly generated entry names.

mod common;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use arcwalk::model::tree_count;
use arcwalk::sanitize::secure_join;
use arcwalk::tree::build_tree;
use arcwalk::{Entry, Error};
use proptest::prelude::*;

fn base() -> PathBuf {
    std::env::temp_dir().join("arcwalk-props").join("out")
}

/// Relative names built from ordinary segments.
fn clean_name() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,7}", 1..5)
        .prop_map(|parts| parts.join("/"))
        .prop_filter("no dot segments", |s| {
            !s.split('/').any(|seg| seg == "." || seg == "..")
        })
}

/// Names carrying one construct that must always be refused.
fn hostile_name() -> impl Strategy<Value = String> {
    (clean_name(), "[a-zA-Z]", 0usize..5).prop_flat_map(|(name, letter, kind)| {
        let escape_depth = name.split('/').count() + 1;
        let hostile = match kind {
            0 => format!("{name}\0tail"),
            1 => format!("../{name}"),
            2 => format!("/{name}"),
            3 => format!("{letter}:{name}"),
            _ => format!("{name}/{}x", "../".repeat(escape_depth)),
        };
        prop_oneof![
            Just(hostile.clone()),
            Just(format!("//{name}")),
            Just(hostile.replace('/', "\\")),
        ]
    })
}

fn strictly_under(dest: &Path, base: &Path) -> bool {
    let abs = std::path::absolute(base).unwrap();
    dest.starts_with(&abs) && dest != abs
}

proptest! {
    /// Ordinary names always land strictly beneath the base.
    #[test]
    fn clean_names_stay_under_base(name in clean_name()) {
        let dest = secure_join(&base(), &name);
        prop_assert!(dest.is_ok(), "{:?} rejected: {:?}", name, dest);
        prop_assert!(strictly_under(&dest.unwrap(), &base()));
    }

    /// Hostile names are refused and the error names the entry.
    #[test]
    fn hostile_names_are_refused(name in hostile_name()) {
        match secure_join(&base(), &name) {
            Err(Error::IllegalPath { entry }) => prop_assert_eq!(entry, name),
            other => prop_assert!(false, "{:?} accepted: {:?}", name, other),
        }
    }

    /// Whatever the input, the result is an error or a path under the base.
    #[test]
    fn arbitrary_names_never_escape(name in "[a-zA-Z0-9./\\\\:\\x00 ]{0,40}") {
        match secure_join(&base(), &name) {
            Ok(dest) => prop_assert!(strictly_under(&dest, &base()), "{:?} -> {:?}", name, dest),
            Err(e) => prop_assert!(e.is_illegal_path(), "{:?}: {:?}", name, e),
        }
    }

    /// Each distinct file and each inferred ancestor appears exactly once.
    #[test]
    fn tree_counts_every_distinct_path(
        files in proptest::collection::btree_set(
            proptest::collection::vec("[a-c]", 0..4).prop_flat_map(|dirs| {
                "[a-c]".prop_map(move |f| {
                    let mut parts = dirs.clone();
                    parts.push(format!("{f}.f"));
                    parts.join("/")
                })
            }),
            1..20,
        )
    ) {
        let mut expected: BTreeSet<String> = BTreeSet::new();
        for file in &files {
            expected.insert(file.clone());
            let mut parent = file.as_str();
            while let Some((dir, _)) = parent.rsplit_once('/') {
                expected.insert(dir.to_string());
                parent = dir;
            }
        }

        let built = build_tree(files.iter().map(|f| Entry::file(f.clone(), 1))).unwrap();
        prop_assert_eq!(tree_count(&built.roots), expected.len());
    }
}

#[cfg(feature = "tar")]
mod adversarial_archives {
    use super::*;
    use arcwalk::ArchiveInnerArgs;
    use common::{TarKind, open_bytes, tar_bytes};
    use tempfile::TempDir;

    fn tar_name() -> impl Strategy<Value = String> {
        prop_oneof![
            clean_name(),
            hostile_name().prop_filter("tar names end at NUL", |n| !n.contains('\0')),
        ]
        .prop_filter("fits a ustar name field", |n| n.len() < 100)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Whole-archive decompress writes nothing beside the output root.
        #[test]
        fn decompress_stays_in_output(names in proptest::collection::vec(tar_name(), 1..6)) {
            let entries: Vec<(&str, TarKind, &[u8])> = names
                .iter()
                .map(|n| (n.as_str(), TarKind::File, b"payload" as &[u8]))
                .collect();
            let bytes = tar_bytes(&entries);

            let parent = TempDir::new().unwrap();
            let out = parent.path().join("out");
            std::fs::create_dir(&out).unwrap();

            let (tool, mut sources) = open_bytes("fuzzed.tar", bytes);
            let _ = tool.decompress(&mut sources, &out, &ArchiveInnerArgs::root(), &mut |_| {});

            let siblings: Vec<_> = std::fs::read_dir(parent.path())
                .unwrap()
                .map(|e| e.unwrap().file_name())
                .collect();
            prop_assert_eq!(siblings, vec![std::ffi::OsString::from("out")]);
        }
    }
}
