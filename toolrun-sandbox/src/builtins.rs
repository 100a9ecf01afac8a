//! Small tools that ship with the sandbox. They only touch the ambient slots,
//! which makes them handy for exercising in-process execution.

use std::io::{Read, Write};

use crate::ambient;
use crate::outcome::{ToolError, ToolResult};
use crate::registry::ToolRegistry;

pub fn register(registry: &mut ToolRegistry) {
    registry
        .register("echo", echo)
        .register("cat", cat)
        .register("pwd", pwd)
        .register("fail", fail);
}

fn operands() -> Vec<String> {
    let argv = ambient::args();
    argv.get(1..).map(<[String]>::to_vec).unwrap_or_default()
}

/// Print the operands separated by single spaces.
fn echo() -> ToolResult {
    let mut out = ambient::stdout();
    writeln!(out, "{}", operands().join(" "))?;
    Ok(())
}

/// Copy standard input to standard output.
fn cat() -> ToolResult {
    let mut input = Vec::new();
    ambient::stdin().read_to_end(&mut input)?;
    ambient::stdout().write_all(&input)?;
    Ok(())
}

/// Print the working directory.
fn pwd() -> ToolResult {
    let cwd = std::env::current_dir()?;
    writeln!(ambient::stdout(), "{}", cwd.display())?;
    Ok(())
}

/// Print the operands to standard error and exit with status 1.
fn fail() -> ToolResult {
    let message = operands().join(" ");
    if !message.is_empty() {
        writeln!(ambient::stderr(), "{message}")?;
    }
    ambient::stderr().flush()?;
    Err(ToolError::exit(1))
}
