//! Crop stage: bounding-box lookup and page-geometry rewrite.
//!
//! Embarrassingly parallel — every file's geometry is independent, so the
//! pool runs one worker per file. A file the oracle cannot measure is left
//! byte-identical and unmarked; only the files with a usable box get a
//! staged rewrite.

use crate::error::FileError;
use crate::oracle::Oracle;
use crate::pdf::{self, PdfDocument};
use crate::pool;
use crate::stages::catalog;
use crate::stages::commit::{self, CROP_SUFFIX};
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files needing a crop pass: everything in the directory not yet marked.
/// Runs against a fresh listing so split-stage renumbering is seen.
pub fn plan(dir: &Path, cropped: &HashSet<String>) -> Result<Vec<String>> {
    let names = catalog::list_pdfs(dir)?;
    Ok(names.into_iter().filter(|n| !cropped.contains(n)).collect())
}

/// Outcome counts for one crop pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct CropStats {
    pub cropped: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Cropped,
    Skipped,
    Failed,
}

/// Crop every listed file through the worker pool. Staged output only; the
/// caller commits after the barrier.
pub async fn execute(dir: &Path, names: Vec<String>, oracle: &Oracle, jobs: usize) -> CropStats {
    let outcomes = pool::run_all(jobs, names, |name| {
        let path = dir.join(&name);
        async move {
            match crop_file(path, &name, oracle).await {
                Ok(true) => {
                    debug!("{}: staged cropped copy", name);
                    Outcome::Cropped
                }
                Ok(false) => Outcome::Skipped,
                Err(err) => {
                    warn!("{}: crop failed: {}", name, err);
                    Outcome::Failed
                }
            }
        }
    })
    .await;

    let mut stats = CropStats::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Cropped => stats.cropped += 1,
            Outcome::Skipped => stats.skipped += 1,
            Outcome::Failed => stats.failed += 1,
        }
    }
    stats
}

/// Returns `Ok(true)` when a staged cropped copy was written, `Ok(false)`
/// for the deliberate no-op (no usable bounding box).
async fn crop_file(path: PathBuf, name: &str, oracle: &Oracle) -> Result<bool, FileError> {
    let bounds = match oracle.bounding_box(&path).await? {
        Some(bounds) => bounds,
        None => return Ok(false),
    };

    let staged = path.with_file_name(commit::staged_name(name, CROP_SUFFIX));
    let write = tokio::task::spawn_blocking(move || -> Result<(), FileError> {
        let doc = PdfDocument::open(&path)?;
        let mut page = doc.extract_page(0)?;
        pdf::document::set_media_box(&mut page, &bounds)?;
        pdf::document::stamp_cropped(&mut page);
        PdfDocument::save(&mut page, &staged)
    })
    .await;

    match write {
        Ok(Ok(())) => Ok(true),
        Ok(Err(err)) => Err(err),
        Err(join) => Err(FileError::Worker(join.to_string())),
    }
}
