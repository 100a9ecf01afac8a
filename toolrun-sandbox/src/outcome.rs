use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

/// Non-normal paths out of an in-process tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool asked to stop the process. Treated as normal completion.
    #[error("tool requested exit with code {code}")]
    Exit { code: i32 },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ToolError {
    /// The "stop now" signal, the in-process equivalent of `exit(code)`.
    pub fn exit(code: i32) -> Self {
        Self::Exit { code }
    }

    pub fn failure(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Failed(anyhow::Error::msg(message))
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit { .. })
    }
}

pub type ToolResult = Result<(), ToolError>;

/// How an execution finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunStatus {
    /// The in-process tool returned normally.
    Completed,
    /// The in-process tool issued a voluntary exit.
    Stopped { code: i32 },
    /// A child process exited; `None` when it was terminated by a signal.
    Exited { code: Option<i32> },
}

impl RunStatus {
    pub fn code(self) -> Option<i32> {
        match self {
            Self::Completed => Some(0),
            Self::Stopped { code } => Some(code),
            Self::Exited { code } => code,
        }
    }

    pub fn success(self) -> bool {
        self.code() == Some(0)
    }
}

/// Captured output of one execution. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    stdout: String,
    stderr: String,
    status: RunStatus,
}

impl RunResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, status: RunStatus) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status,
        }
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }
}
