use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "toolrun",
    version,
    about = "Run a tool in-process or as a child process and report its captured output"
)]
pub struct Cli {
    /// Configuration file (defaults to ./toolrun.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the run result as a single JSON object
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a registered in-process tool module
    Module {
        /// Module identifier, also passed as argv[0]
        id: String,

        #[command(flatten)]
        run: RunOptions,

        /// Arguments handed to the tool after its name
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Spawn an executable as a child process
    Exec {
        #[command(flatten)]
        run: RunOptions,

        /// Program followed by its arguments
        #[arg(last = true, required = true, value_name = "PROGRAM")]
        argv: Vec<String>,
    },

    /// List the registered in-process tool modules
    List,
}

#[derive(Debug, Clone, Args)]
pub struct RunOptions {
    /// Working directory for the tool (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Read this process's stdin and feed it to the tool
    #[arg(long)]
    pub stdin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn module_arguments_follow_the_separator() {
        let cli = Cli::parse_from([
            "toolrun", "--json", "module", "echo", "--stdin", "--", "a", "--b",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Module { id, run, args } => {
                assert_eq!(id, "echo");
                assert!(run.stdin);
                assert_eq!(args, vec!["a".to_string(), "--b".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn exec_requires_a_program() {
        assert!(Cli::try_parse_from(["toolrun", "exec"]).is_err());
    }
}
