//! tsserver client for streaming project-wide diagnostics.
//!
//! The entry point is [`DiagnosticsStream`]: given a [`Session`] (the
//! command surface of a running analysis process), its event channel, and
//! the project's file set, it yields a snapshot of all known diagnostics
//! after every project-wide check — the initial one plus one per background
//! reanalysis — until its [`CancellationToken`] is triggered. Triggering the
//! token closes the session and ends the sequence with a terminal snapshot.
//! [`check_project`] wraps the same machinery for one-off checks.

pub mod session;

pub(crate) mod refresh;
pub(crate) mod store;

mod cancel;
mod discovery;
mod error;
mod stream;

pub use cancel::CancellationToken;
pub use discovery::discover_source_files;
pub use error::{Error, Result};
pub use session::{CompilerOptions, ProjectInfo, Session, SessionEvent};
pub use store::{ContainingFile, IdentityContainingFile};
pub use stream::{DiagnosticsStream, StreamOptions, check_project};
