//! Metadata catalog: one concurrent read per file in the working directory.
//!
//! Reads are side-effect-free (open, count pages, check the cropped marker,
//! close). A file that cannot be read is recorded as a failure and excluded
//! from the rest of the run; only a failure to list the directory itself is
//! fatal.

use crate::error::FileError;
use crate::pdf::PdfDocument;
use crate::pool;
use crate::stem;
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Everything the planners need to know about one file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub name: String,
    pub stem: String,
    pub ordinal: u32,
    pub pages: usize,
    pub cropped: bool,
}

/// A stem and its member files in stream order (ordinal ascending).
#[derive(Debug, Clone)]
pub struct StemGroup {
    pub stem: String,
    pub members: Vec<FileRecord>,
}

/// A file that could not be read, reported and excluded from the run.
#[derive(Debug)]
pub struct ScanFailure {
    pub name: String,
    pub error: FileError,
}

#[derive(Debug, Default)]
pub struct Catalog {
    pub records: Vec<FileRecord>,
    pub failures: Vec<ScanFailure>,
}

impl Catalog {
    /// Names that carry the cropped marker. The split planner may invalidate
    /// entries before the crop stage consumes the set.
    pub fn cropped_set(&self) -> HashSet<String> {
        self.records
            .iter()
            .filter(|r| r.cropped)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Group records into stem groups, members sorted by ordinal. Numeric
    /// order, not name order: `stem2.pdf` precedes `stem10.pdf`.
    pub fn stem_groups(&self) -> Vec<StemGroup> {
        let stems: BTreeSet<&str> = self.records.iter().map(|r| r.stem.as_str()).collect();
        let mut groups = Vec::new();
        for stem in stems {
            let mut members: Vec<FileRecord> = self
                .records
                .iter()
                .filter(|r| stem::belongs_to(stem, &r.name))
                .cloned()
                .collect();
            if members.is_empty() {
                continue;
            }
            members.sort_by_key(|r| r.ordinal);
            groups.push(StemGroup {
                stem: stem.to_string(),
                members,
            });
        }
        groups
    }
}

/// List the `.pdf` names directly inside `dir` (no recursion), sorted by name.
pub fn list_pdfs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("Failed to list directory: {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".pdf") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Read every file's page count and cropped marker through the worker pool.
/// Exactly one record or failure comes back per dispatched file.
pub async fn scan(dir: &Path, jobs: usize) -> Result<Catalog> {
    let names = list_pdfs(dir)?;
    info!("Reading {} files", names.len());

    let results = pool::run_all(jobs, names, |name| {
        let path = dir.join(&name);
        async move {
            let read = tokio::task::spawn_blocking(move || -> Result<(usize, bool), FileError> {
                let doc = PdfDocument::open(&path)?;
                Ok((doc.page_count(), doc.is_cropped()))
            })
            .await;
            (name, read)
        }
    })
    .await;

    let mut catalog = Catalog::default();
    for (name, read) in results {
        match read {
            Ok(Ok((pages, cropped))) => {
                let parts = stem::classify(&name);
                debug!(
                    "{}: {} pages, cropped={}, numbered={}",
                    name, pages, cropped, parts.matched
                );
                catalog.records.push(FileRecord {
                    name,
                    stem: parts.stem,
                    ordinal: parts.ordinal,
                    pages,
                    cropped,
                });
            }
            Ok(Err(error)) => {
                catalog.failures.push(ScanFailure { name, error });
            }
            Err(join) => {
                let error = FileError::Worker(join.to_string());
                catalog.failures.push(ScanFailure { name, error });
            }
        }
    }
    catalog.records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(catalog)
}
