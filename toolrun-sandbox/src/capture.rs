//! Shared plumbing for the in-process strategies.

use tracing::debug;

use crate::ambient::{self, AmbientStream};
use crate::buffer::CapturedStream;
use crate::config::SandboxConfig;
use crate::cwd::{DirectoryGuard, lock_ambient};
use crate::error::{Result, SandboxError};
use crate::outcome::{RunResult, RunStatus, ToolError, ToolResult};
use crate::request::ToolRequest;

/// Buffers installed as the ambient streams for one run.
pub(crate) struct CapturedIo {
    pub(crate) stdout: CapturedStream,
    pub(crate) stderr: CapturedStream,
    pub(crate) stdin: Option<CapturedStream>,
}

impl CapturedIo {
    fn for_request(request: &ToolRequest, config: &SandboxConfig) -> Self {
        Self {
            stdout: CapturedStream::stdout(config.output_newline),
            stderr: CapturedStream::stderr(config.output_newline),
            stdin: request
                .stdin_text()
                .map(|text| CapturedStream::stdin_with(text, config.stdin_newline)),
        }
    }
}

/// Run `body` with the working directory, argv and standard streams
/// substituted for `request`, holding the ambient lock throughout.
///
/// Every slot is back to its prior value before the result is built, and
/// also when `body` panics.
pub(crate) fn run_captured<F>(
    tool: &str,
    request: &ToolRequest,
    config: &SandboxConfig,
    body: F,
) -> Result<RunResult>
where
    F: FnOnce(&CapturedIo) -> ToolResult,
{
    let lock = lock_ambient()?;
    let (outcome, io) = {
        let _cwd = if config.skip_same_directory {
            DirectoryGuard::enter_unless_current(&lock, request.cwd())?
        } else {
            DirectoryGuard::enter(&lock, request.cwd())?
        };

        let io = CapturedIo::for_request(request, config);
        let _argv = ambient::substitute_argv(&lock, request.argv().to_vec());
        let _stdout = ambient::substitute_stream(&lock, AmbientStream::Stdout, io.stdout.clone());
        let _stderr = ambient::substitute_stream(&lock, AmbientStream::Stderr, io.stderr.clone());
        let _stdin = io
            .stdin
            .clone()
            .map(|stdin| ambient::substitute_stream(&lock, AmbientStream::Stdin, stdin));

        (body(&io), io)
    };
    drop(lock);

    let status = match outcome {
        Ok(()) => RunStatus::Completed,
        Err(ToolError::Exit { code }) => {
            debug!(tool, code, "tool requested exit");
            RunStatus::Stopped { code }
        }
        Err(source) => {
            return Err(SandboxError::ToolFailed {
                tool: tool.to_owned(),
                source,
            });
        }
    };

    Ok(RunResult::new(
        io.stdout.get_value(),
        io.stderr.get_value(),
        status,
    ))
}
