use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use toolrun_sandbox::SandboxConfig;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "toolrun.toml";

/// Top-level layout of `toolrun.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct ToolrunConfig {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_string()
    }
}

impl ToolrunConfig {
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse toolrun configuration")?;
        config.sandbox.validate()?;
        Ok(config)
    }
}

/// Load configuration from `explicit`, or from `./toolrun.toml` when it
/// exists, or fall back to defaults.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<ToolrunConfig> {
    let path = match explicit {
        Some(path) if !path.exists() => bail!("config file {} does not exist", path.display()),
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(ToolrunConfig::default());
            }
            candidate
        }
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ToolrunConfig::from_toml_str(&contents)
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level; events go to stderr so tool output on stdout stays clean.
pub(crate) fn initialize_tracing(logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.level))
        .with_context(|| format!("invalid log filter `{}`", logging.level))?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let init_result = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();

    if let Err(err) = init_result {
        tracing::warn!(error = %err, "tracing already initialized; skipping setup");
    }
    Ok(())
}
