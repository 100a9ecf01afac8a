//! Subcommand handlers.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use toolrun_commons::{normalize_path, win_path_to_posix};
use toolrun_sandbox::{ToolRegistry, ToolRequest, ToolSandbox};

use crate::args::{Cli, Commands, RunOptions};
use crate::main_helpers::ToolrunConfig;

mod output;

pub(crate) async fn dispatch(args: &Cli, config: &ToolrunConfig) -> Result<ExitCode> {
    match &args.command {
        Commands::Module { id, run, args: tool_args } => {
            let argv = std::iter::once(id.clone()).chain(tool_args.iter().cloned());
            let request = build_request(argv, run)?;
            handle_module(config, id.clone(), request, args.json).await
        }
        Commands::Exec { run, argv } => {
            let request = build_request(argv.iter().cloned(), run)?;
            handle_exec(config, &request, args.json).await
        }
        Commands::List => handle_list(),
    }
}

fn build_request(argv: impl IntoIterator<Item = String>, run: &RunOptions) -> Result<ToolRequest> {
    let current = std::env::current_dir().context("failed to read current directory")?;
    let cwd = match &run.cwd {
        Some(dir) => resolve_dir(&current, dir),
        None => current,
    };

    let request = ToolRequest::new(argv, cwd);
    if !run.stdin {
        return Ok(request);
    }
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    Ok(request.with_stdin(input))
}

/// Resolve `--cwd` against the current directory. Drive-letter spellings are
/// accepted on Cygwin hosts.
fn resolve_dir(current: &Path, dir: &Path) -> PathBuf {
    let dir = dir.to_string_lossy();
    normalize_path(&current.join(&*win_path_to_posix(&dir)))
}

async fn handle_module(
    config: &ToolrunConfig,
    id: String,
    request: ToolRequest,
    json: bool,
) -> Result<ExitCode> {
    let sandbox =
        ToolSandbox::with_registry(config.sandbox.clone(), ToolRegistry::with_builtins())?;
    // In-process runs block on the ambient lock.
    let result = tokio::task::spawn_blocking(move || sandbox.run_module(&id, &request))
        .await
        .context("module run panicked")??;
    output::emit(&result, json)
}

async fn handle_exec(
    config: &ToolrunConfig,
    request: &ToolRequest,
    json: bool,
) -> Result<ExitCode> {
    let sandbox = ToolSandbox::with_registry(config.sandbox.clone(), ToolRegistry::new())?;
    let result = sandbox.run_path(request).await?;
    output::emit(&result, json)
}

fn handle_list() -> Result<ExitCode> {
    let registry = ToolRegistry::with_builtins();
    for id in registry.ids() {
        println!("{id}");
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn relative_cwd_is_resolved_lexically() {
        let resolved = resolve_dir(Path::new("/work/project"), Path::new("../other/./src"));
        assert_eq!(resolved, Path::new("/work/other/src"));
    }
}
