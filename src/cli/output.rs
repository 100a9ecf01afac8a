use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use toolrun_sandbox::{RunResult, RunStatus};

/// Write `result` to the real stdout/stderr and map its status to an exit code.
pub(super) fn emit(result: &RunResult, json: bool) -> Result<ExitCode> {
    if json {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer(&mut stdout, result).context("failed to serialize run result")?;
        writeln!(stdout)?;
    } else {
        io::stdout().write_all(result.stdout().as_bytes())?;
        io::stderr().write_all(result.stderr().as_bytes())?;
    }
    io::stdout().flush()?;
    Ok(exit_code(result.status()))
}

fn exit_code(status: RunStatus) -> ExitCode {
    match status.code() {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)),
        // Killed by a signal.
        None => ExitCode::FAILURE,
    }
}
