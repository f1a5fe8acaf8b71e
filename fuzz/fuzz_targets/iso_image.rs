//! Fuzz target for the ISO9660 descriptor and directory record parser.
//!
//! Run with: cargo +nightly fuzz run iso_image
//!
//! Malformed images must produce errors, never panics or unbounded reads.

#![no_main]

use arcwalk::{ArchiveArgs, ArchiveInnerArgs, ArchiveSource, IsoTool, Tool};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let tool = IsoTool::new();
    let mut sources = vec![ArchiveSource::from_bytes("fuzz.iso", data.to_vec())];

    let Ok(meta) = tool.get_meta(&mut sources, &ArchiveArgs::new()) else {
        return;
    };
    for node in meta.tree.iter().take(8) {
        let args = ArchiveInnerArgs::new(node.name.clone());
        if node.is_folder {
            let _ = tool.list(&mut sources, &args);
        } else if let Ok(mut stream) = tool.extract(&mut sources, &args) {
            let _ = std::io::copy(&mut stream, &mut std::io::sink());
        }
    }
});
