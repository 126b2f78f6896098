//! Stream orchestrator — turns one project-wide check plus any number of
//! background re-checks into an async sequence of snapshots.
//!
//! The consumer paces the sequence: each [`DiagnosticsStream::next`] call
//! yields the latest completed snapshot, then the stream waits for either a
//! background-reanalysis notice (which starts a fresh cycle) or cancellation
//! (which yields the terminal snapshot). At most one cycle is ever in
//! flight; re-check notices observed mid-cycle coalesce into one follow-up.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tserr_types::ProjectDiagnostics;

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::refresh;
use crate::session::{CompilerOptions, Session, SessionEvent};
use crate::store::{ContainingFile, DiagnosticsAccumulator, ExcludeMatcher, IdentityContainingFile};

/// Extensions preferred when picking the project anchor file.
const PRIMARY_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// Config file name prefix tsserver uses for inferred (configless) projects.
const INFERRED_PROJECT_PREFIX: &str = "/dev/null/inferredProject";

/// Options for opening a diagnostics stream.
pub struct StreamOptions {
    /// Host identity reported to the process via `configure`.
    pub host_info: String,
    /// Feature preferences, relayed opaquely.
    pub preferences: serde_json::Value,
    /// Compiler options applied to inferred projects.
    pub compiler_options: CompilerOptions,
    /// Dependency directory names whose diagnostics are dropped.
    pub exclude_dirs: Vec<String>,
    /// Virtual-to-physical file mapping applied before accumulation.
    pub containing_file: Arc<dyn ContainingFile>,
    /// Decides, from a reported config file name, whether the anchor landed
    /// in an inferred project (in which case every discovered file is opened
    /// so background checks cover the whole set). Pluggable because the
    /// default leans on tsserver's naming convention for anonymous projects.
    pub is_inferred_project: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            host_info: "tserr".to_string(),
            preferences: serde_json::json!({}),
            compiler_options: CompilerOptions::default(),
            exclude_dirs: vec!["node_modules".to_string()],
            containing_file: Arc::new(IdentityContainingFile),
            is_inferred_project: Box::new(|name| name.starts_with(INFERRED_PROJECT_PREFIX)),
        }
    }
}

enum StreamState {
    /// First cycle not run yet.
    Priming,
    /// Yielding snapshots until cancellation.
    Streaming,
    /// Terminal snapshot delivered (or the stream failed).
    Done,
}

/// An incrementally-updating, cancellable sequence of project snapshots.
///
/// Triggering the [`CancellationToken`] is the only close path: the token's
/// teardown (registered by [`open`](Self::open)) closes the session exactly
/// once, and the next pull yields the snapshot accumulated at that moment as
/// the sequence's terminal value.
pub struct DiagnosticsStream<S> {
    session: Arc<Mutex<S>>,
    events: mpsc::Receiver<SessionEvent>,
    files: Vec<PathBuf>,
    store: DiagnosticsAccumulator,
    token: CancellationToken,
    state: StreamState,
    recheck_pending: bool,
}

/// Pick the file the project is anchored on: the first path with a
/// primary-language extension, else the first file.
fn anchor_file(files: &[PathBuf]) -> &PathBuf {
    files
        .iter()
        .find(|f| {
            f.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| PRIMARY_EXTENSIONS.contains(&ext))
        })
        .unwrap_or(&files[0])
}

impl<S: Session> DiagnosticsStream<S> {
    /// Set up the session and prepare the stream.
    ///
    /// Fails with [`Error::NoSourceFiles`] before any session work if the
    /// file set is empty. Registers the session-closing teardown on `token`,
    /// configures the process, opens the anchor file, and — if the anchor
    /// resolves to an inferred project — opens every file so background
    /// checks cover the whole set.
    pub async fn open(
        session: S,
        events: mpsc::Receiver<SessionEvent>,
        files: Vec<PathBuf>,
        token: CancellationToken,
        options: StreamOptions,
    ) -> Result<Self> {
        if files.is_empty() {
            return Err(Error::NoSourceFiles);
        }
        let exclude = ExcludeMatcher::new(&options.exclude_dirs)?;
        let store = DiagnosticsAccumulator::new(exclude, Arc::clone(&options.containing_file));

        let session = Arc::new(Mutex::new(session));
        let teardown_session = Arc::clone(&session);
        token.register_teardown(move || {
            async move { teardown_session.lock().await.close().await }
        });

        {
            let mut guard = session.lock().await;
            guard
                .configure(&options.host_info, &options.preferences)
                .await?;
            guard
                .compiler_options_for_inferred_projects(&options.compiler_options)
                .await?;

            let anchor = anchor_file(&files);
            guard.update_open(std::slice::from_ref(anchor)).await?;
            let info = guard.project_info(anchor).await?;
            tracing::debug!(
                anchor = %anchor.display(),
                config = %info.config_file_name,
                "project resolved"
            );
            if (options.is_inferred_project)(&info.config_file_name) {
                tracing::debug!(files = files.len(), "inferred project, opening all files");
                guard.update_open(&files).await?;
            }
        }

        Ok(Self {
            session,
            events,
            files,
            store,
            token,
            state: StreamState::Priming,
            recheck_pending: false,
        })
    }

    /// Pull the next snapshot.
    ///
    /// The first call runs the initial check and yields its result; later
    /// calls block until a background reanalysis completes a fresh cycle or
    /// the token is triggered. After cancellation, one terminal snapshot is
    /// yielded, then `None`. A session failure yields `Some(Err(..))` and
    /// ends the sequence.
    pub async fn next(&mut self) -> Option<Result<ProjectDiagnostics>> {
        match self.state {
            StreamState::Done => return None,
            StreamState::Priming | StreamState::Streaming => {}
        }
        if self.token.aborted() {
            self.state = StreamState::Done;
            return Some(Ok(self.store.snapshot()));
        }

        if matches!(self.state, StreamState::Priming) {
            self.state = StreamState::Streaming;
            return self.run_cycle_watching_token().await;
        }

        if self.recheck_pending {
            self.recheck_pending = false;
            return self.run_cycle_watching_token().await;
        }

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    None => {
                        self.state = StreamState::Done;
                        return Some(Err(Error::SessionClosed));
                    }
                    Some(SessionEvent::ProjectsUpdatedInBackground) => {
                        tracing::debug!("project reanalyzed in background, refreshing");
                        return self.run_cycle_watching_token().await;
                    }
                    Some(SessionEvent::Diagnostics { category, file, diagnostics }) => {
                        self.store.upsert(file, category, diagnostics);
                    }
                    Some(SessionEvent::RequestCompleted { request_seq }) => {
                        tracing::trace!(request_seq, "completion with no check in flight");
                    }
                },
                () = self.token.cancelled() => {
                    self.state = StreamState::Done;
                    return Some(Ok(self.store.snapshot()));
                }
            }
        }
    }

    /// Run one cycle, racing it against cancellation. On cancellation the
    /// in-flight cycle is abandoned and whatever the store holds becomes the
    /// terminal snapshot.
    async fn run_cycle_watching_token(&mut self) -> Option<Result<ProjectDiagnostics>> {
        let Self {
            session,
            events,
            store,
            files,
            token,
            state,
            recheck_pending,
        } = self;

        let outcome = tokio::select! {
            outcome = refresh::run_cycle(session, events, store, files) => outcome,
            () = token.cancelled() => {
                *state = StreamState::Done;
                return Some(Ok(store.snapshot()));
            }
        };

        match outcome {
            Ok(outcome) => {
                *recheck_pending = outcome.recheck_requested;
                Some(Ok(outcome.snapshot))
            }
            Err(e) => {
                *state = StreamState::Done;
                Some(Err(e))
            }
        }
    }
}

/// Check the project once and tear the session down.
///
/// Equivalent to pulling exactly one snapshot from [`DiagnosticsStream`] and
/// then triggering cancellation.
pub async fn check_project<S: Session>(
    session: S,
    events: mpsc::Receiver<SessionEvent>,
    files: Vec<PathBuf>,
    options: StreamOptions,
) -> Result<ProjectDiagnostics> {
    let token = CancellationToken::new();
    let mut stream =
        DiagnosticsStream::open(session, events, files, token.clone(), options).await?;
    let first = match stream.next().await {
        Some(result) => result,
        // The first pull always yields; a closed channel surfaces as Err above.
        None => Err(Error::SessionClosed),
    };
    match first {
        Ok(snapshot) => {
            token.trigger().await?;
            Ok(snapshot)
        }
        Err(e) => {
            // Close the session anyway; the check failure is the real error.
            if let Err(teardown_err) = token.trigger().await {
                tracing::warn!(error = %teardown_err, "teardown failed after check error");
            }
            Err(e)
        }
    }
}
