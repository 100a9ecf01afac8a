//! toolrun - run developer tools in-process or as child processes and
//! report their captured output.
//!
//! Thin binary entry point that delegates to the handlers in `cli`.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

mod args;
mod cli;
mod main_helpers;

use args::Cli;
use main_helpers::{initialize_tracing, load_config};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    let config = load_config(args.config.as_deref())?;

    initialize_tracing(&config.logging).ok();

    cli::dispatch(&args, &config).await
}
