//! Error types for the tool sandbox.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::outcome::ToolError;

/// Errors surfaced to the caller of an execution strategy.
///
/// A tool that exits voluntarily, or a child process that exits non-zero, is
/// not an error: both produce a [`RunResult`](crate::RunResult).
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The loader has no module under the requested identifier.
    #[error("no tool module registered under `{id}`")]
    ModuleNotFound { id: String },

    /// Path execution needs at least the executable in `argv[0]`.
    #[error("argument vector is empty; the first element must name the executable")]
    EmptyArgv,

    /// The executable could not be launched (not found, permission denied, ...).
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The working directory could not be read or changed.
    #[error("failed to switch working directory to {}: {source}", path.display())]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An in-process tool raised something other than a voluntary exit.
    #[error("tool `{tool}` failed: {source}")]
    ToolFailed {
        tool: String,
        #[source]
        source: ToolError,
    },

    /// An in-process tool tried to start another in-process run from the same thread.
    #[error("in-process tool execution is already running on this thread")]
    Reentrant,

    /// The child process outlived the configured wall-clock limit and was killed.
    #[error("`{program}` timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u64 },

    /// Waiting on or reading from a spawned child failed.
    #[error("i/o error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SandboxError>;
