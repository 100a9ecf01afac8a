use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::buffer::Newline;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SandboxConfig {
    /// Line-ending translation applied to text fed into a tool's stdin.
    #[serde(default)]
    pub stdin_newline: Newline,
    /// Line-ending translation applied to text in-process tools write.
    #[serde(default = "SandboxConfig::default_output_newline")]
    pub output_newline: Newline,
    /// Skip the directory change when the tool's directory is already current.
    #[serde(default = "SandboxConfig::default_skip_same_directory")]
    pub skip_same_directory: bool,
    /// Wall-clock limit (in seconds) for child processes. 0 disables it.
    #[serde(default)]
    pub path_timeout_seconds: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            stdin_newline: Newline::default(),
            output_newline: Self::default_output_newline(),
            skip_same_directory: Self::default_skip_same_directory(),
            path_timeout_seconds: 0,
        }
    }
}

impl SandboxConfig {
    const MAX_PATH_TIMEOUT_SECONDS: u64 = 24 * 60 * 60;

    const fn default_output_newline() -> Newline {
        Newline::Platform
    }

    const fn default_skip_same_directory() -> bool {
        true
    }

    pub fn with_path_timeout(mut self, seconds: u64) -> Self {
        self.path_timeout_seconds = seconds;
        self
    }

    pub fn path_timeout(&self) -> Option<Duration> {
        if self.path_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.path_timeout_seconds))
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.path_timeout_seconds <= Self::MAX_PATH_TIMEOUT_SECONDS,
            "sandbox.path_timeout_seconds must be at most {} seconds (or 0 to disable)",
            Self::MAX_PATH_TIMEOUT_SECONDS
        );
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse sandbox configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sandbox configuration {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid sandbox configuration in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SandboxConfig::default();
        assert_eq!(config.stdin_newline, Newline::Lf);
        assert_eq!(config.output_newline, Newline::Platform);
        assert!(config.skip_same_directory);
        assert!(config.path_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() -> Result<()> {
        let config = SandboxConfig::from_toml_str(
            "stdin_newline = \"crlf\"\npath_timeout_seconds = 30\n",
        )?;
        assert_eq!(config.stdin_newline, Newline::CrLf);
        assert_eq!(config.output_newline, Newline::Platform);
        assert_eq!(config.path_timeout(), Some(Duration::from_secs(30)));
        Ok(())
    }

    #[test]
    fn rejects_oversized_timeout() {
        let config = SandboxConfig::default()
            .with_path_timeout(SandboxConfig::MAX_PATH_TIMEOUT_SECONDS + 1);
        assert!(config.validate().is_err());
        assert!(SandboxConfig::from_toml_str("path_timeout_seconds = 999999").is_err());
    }

    #[test]
    fn rejects_unknown_newline_mode() {
        assert!(SandboxConfig::from_toml_str("stdin_newline = \"cr\"").is_err());
    }
}
