//! Execution sandbox for developer tools.
//!
//! A tool run is described by a [`ToolRequest`] (argument vector, working
//! directory, optional stdin text) and executed by one of three strategies:
//!
//! - [`run_module`]: an in-process tool looked up by identifier through a
//!   [`ModuleLoader`], seeing its argv and standard streams through
//!   [`ambient`].
//! - [`run_api`]: an in-process callback handed the captured buffers directly.
//! - [`run_path`]: a child process spawned with `tokio::process`.
//!
//! All three produce a [`RunResult`] with the captured stdout and stderr text.
//! The in-process strategies serialise on a single process-wide lock and
//! restore the working directory, argv and streams before returning, even
//! when the tool panics. Path execution changes nothing in the host process
//! and runs concurrently.
//!
//! ```no_run
//! use toolrun_sandbox::{SandboxConfig, ToolRegistry, ToolRequest, ToolSandbox};
//!
//! # fn main() -> toolrun_sandbox::Result<()> {
//! let registry = ToolRegistry::with_builtins();
//! let sandbox = ToolSandbox::with_registry(SandboxConfig::default(), registry)?;
//! let request = ToolRequest::new(["echo", "hello"], "/tmp");
//! let result = sandbox.run_module("echo", &request)?;
//! assert_eq!(result.stdout().trim_end(), "hello");
//! # Ok(())
//! # }
//! ```

pub mod ambient;
mod api;
pub mod buffer;
#[cfg(feature = "builtins")]
mod builtins;
mod capture;
mod config;
pub mod cwd;
mod error;
mod module;
mod outcome;
mod path;
pub mod process_group;
mod registry;
mod request;
mod sandbox;
mod substitute;

pub use api::run_api;
pub use buffer::{CapturedStream, Newline, STDERR_NAME, STDIN_NAME, STDOUT_NAME};
pub use config::SandboxConfig;
pub use cwd::{AmbientLock, DirectoryGuard, baseline_dir, init_baseline, lock_ambient};
pub use error::{Result, SandboxError};
pub use module::run_module;
pub use outcome::{RunResult, RunStatus, ToolError, ToolResult};
pub use path::run_path;
pub use registry::{ModuleEntry, ModuleLoader, ToolRegistry};
pub use request::ToolRequest;
pub use sandbox::ToolSandbox;
pub use substitute::Substitution;
