use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("color_mode")
        .args(["color", "no_color"])
))]
/// Top-level CLI options for grove.
pub struct Cli {
    /// Enable colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log every git command and state transition to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Git executable to run
    #[arg(long, global = true, value_name = "PATH")]
    pub git: Option<PathBuf>,

    #[command(subcommand)]
    /// The primary command to execute.
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
/// CLI subcommands supported by grove.
pub enum Commands {
    /// Create a bare-store repository, clone a remote into one, or convert the current repository
    Init {
        /// Directory to initialize, or a remote URL to clone into the current directory
        target: Option<String>,

        /// Convert the repository in the current directory in place
        #[arg(long)]
        convert: bool,

        /// Comma-separated branches to check out as worktrees after cloning
        #[arg(long, value_name = "LIST")]
        branches: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_init_flags() {
        let cli = Cli::parse_from([
            "grove",
            "init",
            "https://github.com/o/r",
            "--branches",
            "main,dev",
            "-v",
        ]);
        assert!(cli.verbose);
        let Commands::Init {
            target,
            convert,
            branches,
        } = cli.command;
        assert_eq!(target.as_deref(), Some("https://github.com/o/r"));
        assert!(!convert);
        assert_eq!(branches.as_deref(), Some("main,dev"));
    }

    #[test]
    fn color_flags_conflict() {
        assert!(Cli::try_parse_from(["grove", "--color", "--no-color", "init"]).is_err());
    }

    #[test]
    fn extra_positionals_are_rejected() {
        assert!(Cli::try_parse_from(["grove", "init", "a", "b"]).is_err());
    }
}
