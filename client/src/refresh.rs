//! One refresh cycle: a project-wide check from command to completion event.

use std::path::PathBuf;

use tokio::sync::{Mutex, mpsc};
use tserr_types::ProjectDiagnostics;

use crate::error::{Error, Result};
use crate::session::{Session, SessionEvent};
use crate::store::DiagnosticsAccumulator;

#[derive(Debug)]
pub(crate) struct RefreshOutcome {
    pub snapshot: ProjectDiagnostics,
    /// A background reanalysis was reported while this cycle ran. The caller
    /// starts one follow-up cycle — many reports coalesce into one flag.
    pub recheck_requested: bool,
}

/// Run one project-wide check to completion.
///
/// Resets the store, issues `geterrForProject` against the first file with
/// zero delay, then pumps the event channel into the store until the
/// completion event for this cycle's correlation seq arrives.
///
/// No internal timeout: completion is owned by the process's protocol
/// guarantee that every check eventually completes or the session dies. The
/// enclosing stream's cancellation is the only escape hatch.
pub(crate) async fn run_cycle<S: Session>(
    session: &Mutex<S>,
    events: &mut mpsc::Receiver<SessionEvent>,
    store: &mut DiagnosticsAccumulator,
    files: &[PathBuf],
) -> Result<RefreshOutcome> {
    let anchor = files.first().ok_or(Error::NoSourceFiles)?;

    store.reset();
    let request_seq = session.lock().await.geterr_for_project(anchor, 0).await?;
    tracing::debug!(request_seq, "project check started");

    let mut recheck_requested = false;
    loop {
        let Some(event) = events.recv().await else {
            return Err(Error::SessionClosed);
        };
        match event {
            SessionEvent::Diagnostics {
                category,
                file,
                diagnostics,
            } => store.upsert(file, category, diagnostics),
            SessionEvent::ProjectsUpdatedInBackground => recheck_requested = true,
            SessionEvent::RequestCompleted { request_seq: seq } if seq == request_seq => break,
            SessionEvent::RequestCompleted { request_seq: seq } => {
                tracing::trace!(seq, "ignoring completion for another request");
            }
        }
    }

    tracing::debug!(request_seq, recheck_requested, "project check completed");
    Ok(RefreshOutcome {
        snapshot: store.snapshot(),
        recheck_requested,
    })
}
