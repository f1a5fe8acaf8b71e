//! Fuzz target for secure_join with arbitrary entry names.
//!
//! Run with: cargo +nightly fuzz run secure_join
//!
//! Every accepted name must map strictly beneath the base directory, and
//! every rejection must carry the offending name.

#![no_main]

use std::path::Path;

use arcwalk::Error;
use arcwalk::sanitize::secure_join;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(entry) = std::str::from_utf8(data) else {
        return;
    };
    let base = Path::new("/srv/extract/out");

    match secure_join(base, entry) {
        Ok(dest) => {
            assert!(
                dest.starts_with(base) && dest != base,
                "{entry:?} escaped to {dest:?}"
            );
            assert!(!entry.contains('\0'), "NUL accepted in {entry:?}");
        }
        Err(Error::IllegalPath { entry: named }) => assert_eq!(named, entry),
        Err(other) => panic!("unexpected error for {entry:?}: {other:?}"),
    }
});
