//! Error taxonomy for the diagnostics client.

/// Errors surfaced by the diagnostics client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The project contains no source files; raised before any session work.
    #[error("project contains no source files")]
    NoSourceFiles,

    /// A command/response exchange with the analysis process failed.
    #[error("session command failed")]
    Session(#[source] anyhow::Error),

    /// The session's event channel closed while the stream was live.
    #[error("session event channel closed")]
    SessionClosed,

    /// Walking the project directory failed.
    #[error("project discovery failed")]
    Discovery(#[source] ignore::Error),

    /// An excluded-directory name could not be compiled into a matcher.
    #[error("invalid exclude pattern")]
    ExcludePattern(#[source] globset::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
