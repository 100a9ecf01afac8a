use std::fmt;
use std::sync::Arc;

use crate::api;
use crate::buffer::CapturedStream;
use crate::config::SandboxConfig;
use crate::cwd::init_baseline;
use crate::error::Result;
use crate::module;
use crate::outcome::{RunResult, ToolResult};
use crate::path;
use crate::registry::{ModuleLoader, ToolRegistry};
use crate::request::ToolRequest;

/// Configured entry point for all three execution strategies.
#[derive(Clone)]
pub struct ToolSandbox {
    config: SandboxConfig,
    loader: Arc<dyn ModuleLoader>,
}

impl ToolSandbox {
    /// Create a sandbox and record the baseline working directory, if no
    /// sandbox has recorded it yet.
    pub fn new(config: SandboxConfig, loader: Arc<dyn ModuleLoader>) -> Result<Self> {
        init_baseline()?;
        Ok(Self { config, loader })
    }

    pub fn with_registry(config: SandboxConfig, registry: ToolRegistry) -> Result<Self> {
        Self::new(config, Arc::new(registry))
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn loader(&self) -> &dyn ModuleLoader {
        self.loader.as_ref()
    }

    pub fn run_module(&self, module_id: &str, request: &ToolRequest) -> Result<RunResult> {
        module::run_module(self.loader.as_ref(), module_id, request, &self.config)
    }

    pub fn run_api<F>(&self, callback: F, request: &ToolRequest) -> Result<RunResult>
    where
        F: FnOnce(
            &[String],
            &CapturedStream,
            &CapturedStream,
            Option<&CapturedStream>,
        ) -> ToolResult,
    {
        api::run_api(callback, request, &self.config)
    }

    pub async fn run_path(&self, request: &ToolRequest) -> Result<RunResult> {
        path::run_path(request, &self.config).await
    }
}

impl fmt::Debug for ToolSandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSandbox")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn exposes_config_and_loader() -> Result<()> {
        let config = SandboxConfig::default().with_path_timeout(5);
        let registry = ToolRegistry::new().with("isort", || Ok(()));
        let sandbox = ToolSandbox::with_registry(config.clone(), registry)?;

        assert_eq!(sandbox.config(), &config);
        assert!(sandbox.loader().resolve("isort").is_some());
        assert!(sandbox.loader().resolve("black").is_none());
        Ok(())
    }
}
