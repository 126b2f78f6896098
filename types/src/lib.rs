//! Core domain types for tserr.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. The client crate relays [`Diagnostic`] values verbatim from
//! the analysis process; nothing here inspects or rewrites them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A 1-based position in a source file, as tsserver reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub offset: u32,
}

/// A single diagnostic reported by the analysis process.
///
/// Treated as an opaque value: the client stores and relays diagnostics
/// but never interprets their contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub start: Location,
    pub end: Location,
    /// Human-readable message text.
    pub text: String,
    /// Numeric diagnostic code, when the process assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

impl Diagnostic {
    /// Format as `path:line:offset: message` (positions are already 1-based).
    #[must_use]
    pub fn display_with_path(&self, path: &Path) -> String {
        format!(
            "{}:{}:{}: {}",
            path.display(),
            self.start.line,
            self.start.offset,
            self.text,
        )
    }
}

/// The three independent diagnostic categories tsserver reports.
///
/// Declaration order is the merge order used when flattening a file's
/// diagnostics into a snapshot: semantic, then suggestion, then syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticCategory {
    Semantic,
    Suggestion,
    Syntax,
}

impl DiagnosticCategory {
    /// All categories, in merge order.
    pub const ALL: [Self; 3] = [Self::Semantic, Self::Suggestion, Self::Syntax];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Suggestion => "suggestion",
            Self::Syntax => "syntax",
        }
    }
}

/// All diagnostics known for one file, merged across categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiagnostics {
    pub file: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

/// Immutable snapshot of all currently known diagnostics.
///
/// Files appear in deterministic (path) order; files whose merged list is
/// empty are never present. Computed on demand; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDiagnostics {
    files: Vec<FileDiagnostics>,
}

impl ProjectDiagnostics {
    /// Construct a snapshot from ordered, non-empty per-file entries.
    #[must_use]
    pub fn new(files: Vec<FileDiagnostics>) -> Self {
        Self { files }
    }

    #[must_use]
    pub fn files(&self) -> &[FileDiagnostics] {
        &self.files
    }

    /// Whether any file has diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total diagnostic count across all files.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.files.iter().map(|f| f.diagnostics.len()).sum()
    }

    /// Compact status string like "3 problems in 2 files".
    #[must_use]
    pub fn status_string(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!(
            "{} problems in {} files",
            self.total_count(),
            self.files.len()
        )
    }
}
