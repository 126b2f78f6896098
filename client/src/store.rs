//! Diagnostics accumulator — per-file, per-category storage for one stream.
//!
//! Exclusively owned by the stream/cycle pair: event handlers write, the
//! cycle start resets, and snapshots are computed on demand. Nothing else
//! touches it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tserr_types::{Diagnostic, DiagnosticCategory, FileDiagnostics, ProjectDiagnostics};

use crate::error::{Error, Result};

/// Maps a reported path to the physical file that owns its diagnostics.
///
/// Virtual (templated) documents report diagnostics under synthetic paths;
/// folding those into the containing file *before* storage keeps virtual and
/// physical entries from fragmenting. Ordinary files map to themselves.
pub trait ContainingFile: Send + Sync {
    fn containing_file(&self, path: &Path) -> PathBuf;
}

/// Identity mapping for projects without virtual documents.
pub struct IdentityContainingFile;

impl ContainingFile for IdentityContainingFile {
    fn containing_file(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// Matcher for dependency directories whose diagnostics are dropped.
pub(crate) struct ExcludeMatcher {
    set: GlobSet,
}

impl ExcludeMatcher {
    /// Build a matcher that excludes any path containing one of the given
    /// directory names as a segment.
    pub fn new(dir_names: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for dir in dir_names {
            builder.add(Glob::new(&format!("**/{dir}/**")).map_err(Error::ExcludePattern)?);
        }
        let set = builder.build().map_err(Error::ExcludePattern)?;
        Ok(Self { set })
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }
}

#[derive(Default)]
struct CategoryEntry {
    semantic: Vec<Diagnostic>,
    suggestion: Vec<Diagnostic>,
    syntax: Vec<Diagnostic>,
}

impl CategoryEntry {
    fn slot_mut(&mut self, category: DiagnosticCategory) -> &mut Vec<Diagnostic> {
        match category {
            DiagnosticCategory::Semantic => &mut self.semantic,
            DiagnosticCategory::Suggestion => &mut self.suggestion,
            DiagnosticCategory::Syntax => &mut self.syntax,
        }
    }

    /// Flatten in fixed merge order regardless of event arrival order.
    fn merged(&self) -> Vec<Diagnostic> {
        let mut merged =
            Vec::with_capacity(self.semantic.len() + self.suggestion.len() + self.syntax.len());
        merged.extend_from_slice(&self.semantic);
        merged.extend_from_slice(&self.suggestion);
        merged.extend_from_slice(&self.syntax);
        merged
    }
}

pub(crate) struct DiagnosticsAccumulator {
    entries: BTreeMap<PathBuf, CategoryEntry>,
    exclude: ExcludeMatcher,
    resolver: Arc<dyn ContainingFile>,
}

impl DiagnosticsAccumulator {
    pub fn new(exclude: ExcludeMatcher, resolver: Arc<dyn ContainingFile>) -> Self {
        Self {
            entries: BTreeMap::new(),
            exclude,
            resolver,
        }
    }

    /// Store one category's diagnostic list for one file, replacing any
    /// previous list for that (file, category) pair.
    ///
    /// Empty lists are ignored: the process reports each category only when
    /// it has something to say, so absence of an event is not a clearing
    /// signal and must never erase an earlier non-empty result.
    pub fn upsert(
        &mut self,
        file: PathBuf,
        category: DiagnosticCategory,
        diagnostics: Vec<Diagnostic>,
    ) {
        if diagnostics.is_empty() {
            return;
        }
        let file = self.resolver.containing_file(&file);
        if self.exclude.is_excluded(&file) {
            tracing::trace!(file = %file.display(), "dropping diagnostics for excluded path");
            return;
        }
        tracing::debug!(
            file = %file.display(),
            category = category.label(),
            count = diagnostics.len(),
            "diagnostics updated"
        );
        *self.entries.entry(file).or_default().slot_mut(category) = diagnostics;
    }

    /// Flatten into a snapshot: files in path order, each file's list merged
    /// semantic ++ suggestion ++ syntax, empty files omitted. Pure.
    pub fn snapshot(&self) -> ProjectDiagnostics {
        let files = self
            .entries
            .iter()
            .map(|(file, entry)| FileDiagnostics {
                file: file.clone(),
                diagnostics: entry.merged(),
            })
            .filter(|f| !f.diagnostics.is_empty())
            .collect();
        ProjectDiagnostics::new(files)
    }

    /// Drop every entry. Called at the start of each refresh cycle, never
    /// mid-cycle.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tserr_types::Location;

    fn make_diag(line: u32, text: &str) -> Diagnostic {
        Diagnostic {
            start: Location { line, offset: 1 },
            end: Location { line, offset: 2 },
            text: text.to_string(),
            code: None,
        }
    }

    fn test_store() -> DiagnosticsAccumulator {
        DiagnosticsAccumulator::new(
            ExcludeMatcher::new(&["node_modules".to_string()]).unwrap(),
            Arc::new(IdentityContainingFile),
        )
    }

    #[test]
    fn test_empty_store_snapshots_empty() {
        assert!(test_store().snapshot().is_empty());
    }

    #[test]
    fn test_upsert_and_snapshot() {
        let mut store = test_store();
        store.upsert(
            PathBuf::from("a.ts"),
            DiagnosticCategory::Semantic,
            vec![make_diag(1, "e1")],
        );
        let snap = store.snapshot();
        assert_eq!(snap.files().len(), 1);
        assert_eq!(snap.files()[0].file, PathBuf::from("a.ts"));
        assert_eq!(snap.files()[0].diagnostics, vec![make_diag(1, "e1")]);
    }

    #[test]
    fn test_empty_upsert_never_clears_previous_result() {
        let mut store = test_store();
        store.upsert(
            PathBuf::from("a.ts"),
            DiagnosticCategory::Semantic,
            vec![make_diag(1, "e1")],
        );
        store.upsert(PathBuf::from("a.ts"), DiagnosticCategory::Semantic, vec![]);
        assert_eq!(store.snapshot().total_count(), 1);
    }

    #[test]
    fn test_category_upsert_replaces_wholesale() {
        let mut store = test_store();
        store.upsert(
            PathBuf::from("a.ts"),
            DiagnosticCategory::Syntax,
            vec![make_diag(1, "e1"), make_diag(2, "e2")],
        );
        store.upsert(
            PathBuf::from("a.ts"),
            DiagnosticCategory::Syntax,
            vec![make_diag(3, "e3")],
        );
        let snap = store.snapshot();
        assert_eq!(snap.files()[0].diagnostics, vec![make_diag(3, "e3")]);
    }

    #[test]
    fn test_merge_order_independent_of_arrival_order() {
        let mut store = test_store();
        store.upsert(
            PathBuf::from("a.ts"),
            DiagnosticCategory::Syntax,
            vec![make_diag(3, "syntax")],
        );
        store.upsert(
            PathBuf::from("a.ts"),
            DiagnosticCategory::Semantic,
            vec![make_diag(1, "semantic")],
        );
        store.upsert(
            PathBuf::from("a.ts"),
            DiagnosticCategory::Suggestion,
            vec![make_diag(2, "suggestion")],
        );

        let snap = store.snapshot();
        let texts: Vec<&str> = snap.files()[0]
            .diagnostics
            .iter()
            .map(|d| d.text.as_str())
            .collect();
        assert_eq!(texts, vec!["semantic", "suggestion", "syntax"]);
    }

    #[test]
    fn test_excluded_dependency_path_is_dropped() {
        let mut store = test_store();
        store.upsert(
            PathBuf::from("/proj/node_modules/lib/index.ts"),
            DiagnosticCategory::Semantic,
            vec![make_diag(1, "e1")],
        );
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_containing_file_resolver_merges_virtual_and_physical() {
        struct TemplateResolver;
        impl ContainingFile for TemplateResolver {
            fn containing_file(&self, path: &Path) -> PathBuf {
                match path.to_str() {
                    Some(s) => PathBuf::from(s.trim_end_matches(".__virtual.ts")),
                    None => path.to_path_buf(),
                }
            }
        }

        let mut store = DiagnosticsAccumulator::new(
            ExcludeMatcher::new(&["node_modules".to_string()]).unwrap(),
            Arc::new(TemplateResolver),
        );
        store.upsert(
            PathBuf::from("page.vue.__virtual.ts"),
            DiagnosticCategory::Semantic,
            vec![make_diag(1, "e1")],
        );
        store.upsert(
            PathBuf::from("page.vue"),
            DiagnosticCategory::Syntax,
            vec![make_diag(2, "e2")],
        );

        let snap = store.snapshot();
        assert_eq!(snap.files().len(), 1);
        assert_eq!(snap.files()[0].file, PathBuf::from("page.vue"));
        assert_eq!(snap.files()[0].diagnostics.len(), 2);
    }

    #[test]
    fn test_snapshot_order_is_deterministic() {
        let mut store = test_store();
        store.upsert(
            PathBuf::from("b.ts"),
            DiagnosticCategory::Semantic,
            vec![make_diag(1, "e1")],
        );
        store.upsert(
            PathBuf::from("a.ts"),
            DiagnosticCategory::Semantic,
            vec![make_diag(1, "e2")],
        );
        let snap = store.snapshot();
        assert_eq!(snap.files()[0].file, PathBuf::from("a.ts"));
        assert_eq!(snap.files()[1].file, PathBuf::from("b.ts"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = test_store();
        store.upsert(
            PathBuf::from("a.ts"),
            DiagnosticCategory::Semantic,
            vec![make_diag(1, "e1")],
        );
        store.reset();
        assert!(store.snapshot().is_empty());
    }
}
