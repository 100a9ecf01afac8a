use std::path::{Path, PathBuf};

/// Describes one tool run, independent of the strategy that executes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    argv: Vec<String>,
    use_stdin: bool,
    cwd: PathBuf,
    input: Option<String>,
}

impl ToolRequest {
    pub fn new<I, S>(argv: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            use_stdin: false,
            cwd: cwd.into(),
            input: None,
        }
    }

    /// Feed `input` to the tool's standard input.
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.use_stdin = true;
        self.input = Some(input.into());
        self
    }

    /// Toggle stdin feeding without changing the input text.
    pub fn stdin_enabled(mut self, enabled: bool) -> Self {
        self.use_stdin = enabled;
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn uses_stdin(&self) -> bool {
        self.use_stdin
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// Text to pre-load as stdin for in-process runs: only when stdin feeding
    /// is on and there is something to feed.
    pub(crate) fn stdin_text(&self) -> Option<&str> {
        if self.use_stdin { self.input() } else { None }
    }
}
