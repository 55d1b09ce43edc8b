use std::path::PathBuf;

use asa_core::error::CoreError;
use asa_session::SessionError;

/// Errors returned by driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A domain-level error from `asa_core` (validation, parsing, unsupported).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The device session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An operation needing the device was called before `open`.
    #[error("Not connected to {0}; call open() first")]
    NotConnected(String),

    /// The candidate file could not be read.
    #[error("Failed to read candidate file {path}: {source}")]
    CandidateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested security context could not be entered.
    #[error("Failed to change to context '{context}': {output}")]
    ContextSwitch { context: String, output: String },

    /// The device rejected a configuration line during commit.
    #[error("Commit failed at '{line}': {output}")]
    CommitFailed { line: String, output: String },
}
