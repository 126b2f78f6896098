//! Session boundary — the command/event surface of the analysis process.
//!
//! The process itself (spawning, wire framing, request/response matching)
//! lives behind the [`Session`] trait. This crate only sequences commands
//! and consumes the typed event channel handed to the stream alongside the
//! session handle.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tserr_types::{Diagnostic, DiagnosticCategory};

use crate::error::Result;

/// Compiler options applied to inferred (configless) projects.
///
/// Serialized in the wire shape tsserver expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    pub allow_js: bool,
    pub check_js: bool,
    pub strict: bool,
    pub jsx: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            allow_js: true,
            check_js: true,
            strict: true,
            jsx: "preserve".to_string(),
        }
    }
}

/// Project metadata returned by the `projectInfo` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    /// Path of the project's config file. Inferred projects report a
    /// synthetic name; see `StreamOptions::is_inferred_project`.
    pub config_file_name: String,
}

/// A push event from the analysis process.
///
/// Demultiplexed into typed payloads at the session boundary so consumers
/// never match on event-name strings.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The command identified by `request_seq` finished.
    RequestCompleted { request_seq: u64 },
    /// One category's complete diagnostic list for one file. Replaces any
    /// previous list for that (file, category) pair.
    Diagnostics {
        category: DiagnosticCategory,
        file: PathBuf,
        diagnostics: Vec<Diagnostic>,
    },
    /// The process reanalyzed the project without being asked.
    ProjectsUpdatedInBackground,
}

/// One connection to the analysis process.
///
/// Commands resolve once the process sends the correlated response. Push
/// events (diagnostics, completions, background-update notices) arrive on
/// the `mpsc::Receiver<SessionEvent>` the implementation hands out next to
/// the session handle.
pub trait Session: Send + 'static {
    /// Identify the host and apply feature preferences.
    fn configure(
        &mut self,
        host_info: &str,
        preferences: &serde_json::Value,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Set the compiler options used for inferred projects.
    fn compiler_options_for_inferred_projects(
        &mut self,
        options: &CompilerOptions,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Declare the set of open files.
    fn update_open(&mut self, files: &[PathBuf]) -> impl Future<Output = Result<()>> + Send;

    /// Query which project owns `file`.
    fn project_info(&mut self, file: &Path) -> impl Future<Output = Result<ProjectInfo>> + Send;

    /// Start a project-wide check anchored at `file`.
    ///
    /// Returns the correlation seq whose `RequestCompleted` event signals
    /// that every file's diagnostics have been pushed.
    fn geterr_for_project(
        &mut self,
        file: &Path,
        delay_ms: u64,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Close the connection and tear down the process.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
