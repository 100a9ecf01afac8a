use tracing::{info, info_span};

use crate::capture::run_captured;
use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};
use crate::outcome::RunResult;
use crate::registry::ModuleLoader;
use crate::request::ToolRequest;

/// Run the module registered as `module_id` in-process, as if it were the
/// program entry point.
///
/// The identifier is resolved before the ambient lock is taken, so an unknown
/// module never waits behind another run.
pub fn run_module(
    loader: &dyn ModuleLoader,
    module_id: &str,
    request: &ToolRequest,
    config: &SandboxConfig,
) -> Result<RunResult> {
    let entry = loader
        .resolve(module_id)
        .ok_or_else(|| SandboxError::ModuleNotFound {
            id: module_id.to_owned(),
        })?;

    let span = info_span!("run_module", module = module_id, cwd = %request.cwd().display());
    let _entered = span.enter();

    let result = run_captured(module_id, request, config, |_| entry())?;
    info!(status = ?result.status(), "module run finished");
    Ok(result)
}
