//! Shared test utilities.
//!
//! Fixture setup plus lookup helpers over render reports.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let report = render_dir(&pipeline, &tmp.path().join("blocks"), &out, &options).unwrap();
//!
//! let hero = find_outcome(&report, "010-hero.html");
//! assert_eq!(hero.scope_ids.len(), 1);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::batch::{BatchReport, BlockOutcome};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/` to a temp directory and return it.
///
/// The copy holds `blocks/` (fragments with sidecar descriptors) and
/// `fields.json` (the field store they reference). Tests may mutate it
/// freely.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Report lookups: panics with a clear message on miss
// =========================================================================

/// Find a block outcome by relative path. Panics if not found.
pub fn find_outcome<'a>(report: &'a BatchReport, path: &str) -> &'a BlockOutcome {
    report
        .blocks
        .iter()
        .find(|b| b.path == Path::new(path))
        .unwrap_or_else(|| {
            let paths: Vec<String> = report
                .blocks
                .iter()
                .map(|b| b.path.display().to_string())
                .collect();
            panic!("block '{path}' not found. Available: {paths:?}")
        })
}

/// Count `needle` occurrences in `haystack`.
pub fn occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}
