use tracing::{info, info_span};

use crate::buffer::CapturedStream;
use crate::capture::run_captured;
use crate::config::SandboxConfig;
use crate::error::Result;
use crate::outcome::{RunResult, ToolResult};
use crate::request::ToolRequest;

const API_TOOL_LABEL: &str = "<api>";

/// Run `callback` in-process with the same environment a module would see.
///
/// The callback receives `argv` and the very buffers installed as the ambient
/// stdout, stderr and (when input was requested) stdin.
pub fn run_api<F>(callback: F, request: &ToolRequest, config: &SandboxConfig) -> Result<RunResult>
where
    F: FnOnce(&[String], &CapturedStream, &CapturedStream, Option<&CapturedStream>) -> ToolResult,
{
    let tool = request.program().unwrap_or(API_TOOL_LABEL);
    let span = info_span!("run_api", tool, cwd = %request.cwd().display());
    let _entered = span.enter();

    let result = run_captured(tool, request, config, |io| {
        callback(request.argv(), &io.stdout, &io.stderr, io.stdin.as_ref())
    })?;
    info!(status = ?result.status(), "api run finished");
    Ok(result)
}
