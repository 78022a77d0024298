//! Staged-file naming and the commit stage.
//!
//! Workers never write to a final name. They stage output under a reserved
//! suffix; once the whole stage has drained, the staged files are promoted
//! over the originals with an atomic rename. Commit runs single-threaded,
//! strictly after the stage's join barrier.

use crate::stages::catalog;
use anyhow::Result;
use std::path::Path;
use tracing::{debug, warn};

pub const SPLIT_SUFFIX: &str = "_SPLIT.pdf";
pub const CROP_SUFFIX: &str = "_CROP.pdf";

/// `a1.pdf` -> `a1_SPLIT.pdf`
pub fn staged_name(final_name: &str, suffix: &str) -> String {
    match final_name.strip_suffix(".pdf") {
        Some(base) => format!("{}{}", base, suffix),
        None => format!("{}{}", final_name, suffix),
    }
}

/// `a1_SPLIT.pdf` -> `a1.pdf`; `None` when `staged` does not carry `suffix`.
pub fn final_name(staged: &str, suffix: &str) -> Option<String> {
    staged
        .strip_suffix(suffix)
        .map(|base| format!("{}.pdf", base))
}

/// Promote every staged file carrying `suffix` over its final name.
///
/// A failed rename loses only that file; anything already promoted stays
/// promoted. Returns the number of files promoted.
pub fn commit(dir: &Path, suffix: &str) -> Result<usize> {
    let mut promoted = 0;
    for name in catalog::list_pdfs(dir)? {
        let target = match final_name(&name, suffix) {
            Some(target) => target,
            None => continue,
        };
        match std::fs::rename(dir.join(&name), dir.join(&target)) {
            Ok(()) => {
                debug!("{} -> {}", name, target);
                promoted += 1;
            }
            Err(err) => warn!("{}: commit failed: {}", name, err),
        }
    }
    Ok(promoted)
}
