//! Path execution: run the tool as a child process.
//!
//! The working directory is handed to the child directly, so this strategy
//! never touches the process-wide ambient state and takes no lock. Any number
//! of path runs may proceed concurrently with each other and with an
//! in-process run.

use std::borrow::Cow;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::process::{Output, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::SandboxConfig;
use crate::cwd::init_baseline;
use crate::error::{Result, SandboxError};
use crate::outcome::{RunResult, RunStatus};
use crate::process_group;
use crate::request::ToolRequest;

/// Spawn `argv[0]` with the remaining arguments in `request.cwd()` and collect
/// its output once it exits.
///
/// A relative `request.cwd()` is resolved against the baseline directory, not
/// the live working directory an in-process run may be holding.
///
/// A non-zero exit is not an error; it is reported as [`RunStatus::Exited`].
pub async fn run_path(request: &ToolRequest, config: &SandboxConfig) -> Result<RunResult> {
    let (program, args) = request
        .argv()
        .split_first()
        .ok_or(SandboxError::EmptyArgv)?;

    let span = info_span!("run_path", program = %program, cwd = %request.cwd().display());
    run_child(program, args, request, config).instrument(span).await
}

async fn run_child(
    program: &str,
    args: &[String],
    request: &ToolRequest,
    config: &SandboxConfig,
) -> Result<RunResult> {
    let cwd = child_dir(request.cwd())?;
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if request.uses_stdin() {
        command.stdin(Stdio::piped());
    } else {
        command.stdin(Stdio::null());
    }

    #[cfg(unix)]
    command.process_group(0);

    debug!(args = args.len(), stdin = request.uses_stdin(), "spawning tool process");
    let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
        program: program.to_owned(),
        source,
    })?;
    let pid = child.id();

    let input = request
        .input()
        .filter(|_| request.uses_stdin())
        .map(|text| config.stdin_newline.translate(text.as_bytes()).into_owned());
    let stdin = child.stdin.take();

    let exchange = async move {
        let (fed, output) = tokio::join!(feed_stdin(stdin, input), child.wait_with_output());
        if let Err(err) = fed {
            warn!(error = %err, "failed to write tool stdin");
        }
        output
    };

    let output = match config.path_timeout() {
        None => exchange.await,
        Some(limit) => match tokio::time::timeout(limit, exchange).await {
            Ok(output) => output,
            Err(_) => {
                let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms, "tool process timed out; killing its process group");
                if let Some(pgid) = pid
                    && let Err(err) = process_group::kill_process_group(pgid)
                {
                    warn!(pgid, error = %err, "failed to kill tool process group");
                }
                return Err(SandboxError::Timeout {
                    program: program.to_owned(),
                    timeout_ms,
                });
            }
        },
    }
    .map_err(|source| SandboxError::Io {
        program: program.to_owned(),
        source,
    })?;

    let result = into_run_result(&output);
    info!(status = ?result.status(), "path run finished");
    Ok(result)
}

fn child_dir(cwd: &Path) -> Result<Cow<'_, Path>> {
    if cwd.is_absolute() {
        return Ok(Cow::Borrowed(cwd));
    }
    Ok(Cow::Owned(init_baseline()?.join(cwd)))
}

/// Write `input` to the child's stdin and close it. A child that exits
/// without reading its input is not an error.
async fn feed_stdin(stdin: Option<ChildStdin>, input: Option<Vec<u8>>) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    if let Some(bytes) = input {
        match stdin.write_all(&bytes).await {
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                debug!("tool closed stdin before reading all input");
                return Ok(());
            }
            other => other?,
        }
    }
    match stdin.shutdown().await {
        Err(err) if err.kind() != ErrorKind::BrokenPipe => Err(err),
        _ => Ok(()),
    }
}

fn into_run_result(output: &Output) -> RunResult {
    RunResult::new(
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
        RunStatus::Exited {
            code: output.status.code(),
        },
    )
}
