//! Split stage: renumbering plans and per-stem execution.

use crate::error::FileError;
use crate::pdf::PdfDocument;
use crate::pool;
use crate::stages::catalog::StemGroup;
use crate::stages::commit::{self, SPLIT_SUFFIX};
use crate::stem;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One page of one source file landing at one final name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub target: String,
    pub source: String,
    pub page: usize,
}

/// The renumbering plan for one stem, plus the target names whose cropped
/// marker the plan makes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub stem: String,
    pub entries: Vec<PlanEntry>,
    pub invalidated: Vec<String>,
}

/// Decide whether `group` needs splitting and how its pages renumber.
///
/// Splitting triggers at the first member with more than one page; every
/// member from there on is re-emitted one page per file, even when it is
/// already single-page, so the stream keeps its order under the new numbers.
/// Members before the trigger stay in place. Returns `None` when every
/// member is already exactly one page.
///
/// The cropped set is read-only here; names whose content the plan will
/// replace come back in `invalidated` for the caller to merge.
pub fn plan(group: &StemGroup, cropped: &HashSet<String>) -> Option<SplitPlan> {
    let total_pages: usize = group.members.iter().map(|m| m.pages).sum();
    if total_pages == group.members.len() {
        return None;
    }

    let mut splitting = false;
    let mut ordinal = group.members.first().map(|m| m.ordinal).unwrap_or(0);
    let mut entries = Vec::new();
    let mut invalidated = Vec::new();

    for member in &group.members {
        if !splitting && member.pages > 1 {
            splitting = true;
        }
        if !splitting {
            ordinal += 1;
            continue;
        }
        for page in 0..member.pages {
            let target = stem::file_name(&group.stem, ordinal);
            if cropped.contains(&target) {
                invalidated.push(target.clone());
            }
            entries.push(PlanEntry {
                target,
                source: member.name.clone(),
                page,
            });
            ordinal += 1;
        }
    }

    Some(SplitPlan {
        stem: group.stem.clone(),
        entries,
        invalidated,
    })
}

/// Execute every plan, one worker per stem (ordinals within a stem are
/// sequential and owned by that worker). Output is staged only; the caller
/// commits after the barrier. Returns the number of staged files written.
pub async fn execute(dir: &Path, plans: Vec<SplitPlan>, jobs: usize) -> usize {
    let results = pool::run_all(jobs, plans, |plan| {
        let dir = dir.to_path_buf();
        async move {
            let stem = plan.stem.clone();
            match tokio::task::spawn_blocking(move || execute_stem(&dir, &plan)).await {
                Ok(Ok(written)) => written,
                Ok(Err(err)) => {
                    warn!("stem {}: split failed: {}; originals left in place", stem, err);
                    0
                }
                Err(join) => {
                    warn!("stem {}: split worker failed: {}", stem, join);
                    0
                }
            }
        }
    })
    .await;
    results.into_iter().sum()
}

fn execute_stem(dir: &Path, plan: &SplitPlan) -> Result<usize, FileError> {
    let mut staged = Vec::new();
    match write_stem(dir, plan, &mut staged) {
        Ok(written) => Ok(written),
        Err(err) => {
            // Later ordinals depend on earlier ones; a partial stem must
            // never reach the commit stage.
            for path in staged {
                let _ = std::fs::remove_file(path);
            }
            Err(err)
        }
    }
}

fn write_stem(dir: &Path, plan: &SplitPlan, staged: &mut Vec<PathBuf>) -> Result<usize, FileError> {
    let mut written = 0;
    let mut index = 0;
    while index < plan.entries.len() {
        let source = &plan.entries[index].source;
        let doc = PdfDocument::open(dir.join(source))?;
        debug!("{} ({} pages)", source, doc.page_count());

        while index < plan.entries.len() && &plan.entries[index].source == source {
            let entry = &plan.entries[index];
            let mut page_doc = doc.extract_page(entry.page)?;
            let staged_path = dir.join(commit::staged_name(&entry.target, SPLIT_SUFFIX));
            PdfDocument::save(&mut page_doc, &staged_path)?;
            staged.push(staged_path);
            written += 1;
            index += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::sample_document;
    use crate::stages::catalog::{self, FileRecord};

    fn record(name: &str, pages: usize) -> FileRecord {
        let parts = stem::classify(name);
        FileRecord {
            name: name.to_string(),
            stem: parts.stem,
            ordinal: parts.ordinal,
            pages,
            cropped: false,
        }
    }

    fn group(stem: &str, members: Vec<FileRecord>) -> StemGroup {
        StemGroup {
            stem: stem.to_string(),
            members,
        }
    }

    #[test]
    fn test_all_single_page_is_noop() {
        let members = vec![record("a.pdf", 1), record("a1.pdf", 1), record("a2.pdf", 1)];
        let g = group("a", members.clone());
        assert!(plan(&g, &HashSet::new()).is_none());

        // Order of members does not change the verdict.
        let mut reversed = members;
        reversed.reverse();
        assert!(plan(&group("a", reversed), &HashSet::new()).is_none());
    }

    #[test]
    fn test_trigger_cascades_renumbering() {
        let g = group(
            "a",
            vec![record("a.pdf", 1), record("a1.pdf", 3), record("a2.pdf", 1)],
        );
        let p = plan(&g, &HashSet::new()).unwrap();

        // a.pdf passes through; a1.pdf's three pages become a1..a3; the
        // original single-page a2.pdf is renumbered to a4.
        let expected = vec![
            PlanEntry {
                target: "a1.pdf".into(),
                source: "a1.pdf".into(),
                page: 0,
            },
            PlanEntry {
                target: "a2.pdf".into(),
                source: "a1.pdf".into(),
                page: 1,
            },
            PlanEntry {
                target: "a3.pdf".into(),
                source: "a1.pdf".into(),
                page: 2,
            },
            PlanEntry {
                target: "a4.pdf".into(),
                source: "a2.pdf".into(),
                page: 0,
            },
        ];
        assert_eq!(p.entries, expected);
    }

    #[test]
    fn test_multi_page_base_file_splits_from_start() {
        let g = group("a", vec![record("a.pdf", 2), record("a1.pdf", 1)]);
        let p = plan(&g, &HashSet::new()).unwrap();
        let targets: Vec<&str> = p.entries.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["a.pdf", "a1.pdf", "a2.pdf"]);
        assert_eq!(p.entries[2].source, "a1.pdf");
    }

    #[test]
    fn test_counter_starts_at_first_ordinal() {
        // No base file: the group starts at ordinal 2.
        let g = group("a", vec![record("a2.pdf", 1), record("a3.pdf", 2)]);
        let p = plan(&g, &HashSet::new()).unwrap();
        let targets: Vec<&str> = p.entries.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["a3.pdf", "a4.pdf"]);
    }

    #[test]
    fn test_invalidates_replaced_cropped_names() {
        let g = group(
            "a",
            vec![record("a.pdf", 1), record("a1.pdf", 2), record("a2.pdf", 1)],
        );
        let cropped: HashSet<String> = ["a.pdf", "a2.pdf", "a3.pdf", "b.pdf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let p = plan(&g, &cropped).unwrap();

        // a.pdf is untouched; a1..a3 are rewritten, so a2 and a3 lose their
        // marker. b.pdf belongs to another stem.
        assert_eq!(p.invalidated, vec!["a2.pdf".to_string(), "a3.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_execute_and_commit_preserves_stream_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, label, pages) in [
            ("a.pdf", "alpha", 1),
            ("a1.pdf", "bravo", 3),
            ("a2.pdf", "charlie", 1),
        ] {
            let mut doc = sample_document(label, pages);
            PdfDocument::save(&mut doc, dir.path().join(name)).unwrap();
        }

        let catalog = catalog::scan(dir.path(), 4).await.unwrap();
        let cropped = catalog.cropped_set();
        let plans: Vec<SplitPlan> = catalog
            .stem_groups()
            .iter()
            .filter_map(|g| plan(g, &cropped))
            .collect();
        assert_eq!(plans.len(), 1);

        let written = execute(dir.path(), plans, 4).await;
        assert_eq!(written, 4);
        let promoted = commit::commit(dir.path(), SPLIT_SUFFIX).unwrap();
        assert_eq!(promoted, 4);

        let expect = [
            ("a.pdf", "(alpha 1)"),
            ("a1.pdf", "(bravo 1)"),
            ("a2.pdf", "(bravo 2)"),
            ("a3.pdf", "(bravo 3)"),
            ("a4.pdf", "(charlie 1)"),
        ];
        for (name, marker) in expect {
            let opened = PdfDocument::open(dir.path().join(name)).unwrap();
            assert_eq!(opened.page_count(), 1, "{} should be single-page", name);
            let mut doc = opened.doc;
            doc.decompress();
            let page_id = *doc.get_pages().values().next().unwrap();
            let content = doc.get_page_content(page_id).unwrap();
            let text = String::from_utf8_lossy(&content).into_owned();
            assert!(text.contains(marker), "{}: expected {}, got {}", name, marker, text);
        }

        // Second run over the already-split directory plans nothing.
        let rescan = catalog::scan(dir.path(), 4).await.unwrap();
        let again: Vec<SplitPlan> = rescan
            .stem_groups()
            .iter()
            .filter_map(|g| plan(g, &rescan.cropped_set()))
            .collect();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_failed_stem_leaves_no_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = sample_document("alpha", 2);
        PdfDocument::save(&mut doc, dir.path().join("a.pdf")).unwrap();

        // Plan references a source that does not exist on disk.
        let bad = SplitPlan {
            stem: "a".to_string(),
            entries: vec![
                PlanEntry {
                    target: "a.pdf".into(),
                    source: "a.pdf".into(),
                    page: 0,
                },
                PlanEntry {
                    target: "a1.pdf".into(),
                    source: "missing.pdf".into(),
                    page: 0,
                },
            ],
            invalidated: vec![],
        };

        let written = execute(dir.path(), vec![bad], 2).await;
        assert_eq!(written, 0);
        let leftover = catalog::list_pdfs(dir.path()).unwrap();
        assert_eq!(leftover, vec!["a.pdf".to_string()]);
    }
}
