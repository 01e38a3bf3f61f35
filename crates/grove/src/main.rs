#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Command-line interface for creating and converting bare-store repositories
//! via the libgrove crate.

use std::{
    env,
    io::{self, IsTerminal, Write},
    process,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use grove_term::{Output, Quiet, Terminal};
use libgrove::{GroveError, InitRequest, SystemGit};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Command-line argument definitions.
mod args;
/// Subcommand implementations.
mod commands;
/// Settings resolution.
mod config;
/// Rendering helpers shared by commands.
mod ui;

use args::{Cli, Commands};
use config::Config;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "GROVE_LOG";

/// Install a stderr tracing subscriber. `GROVE_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// CLI entrypoint.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_with_overrides(&cli);
    let color = match &config {
        Ok(config) => config.use_color(),
        Err(_) => !cli.no_color && (cli.color || io::stdout().is_terminal()),
    };

    let quiet = cli.quiet;
    let output: Arc<dyn Output> = if quiet {
        Arc::new(Quiet)
    } else {
        Arc::new(Terminal::new(color))
    };

    if let Err(e) = config.and_then(|config| run(cli, &config, &output)) {
        // Reset any existing colors only if color was enabled and stdout is a TTY
        if color && io::stdout().is_terminal() {
            print!("\x1b[0m");
            if let Err(flush_err) = io::stdout().flush() {
                eprintln!("Failed to flush stdout while resetting colors: {flush_err}");
            }
        }

        // Errors reach stderr even in quiet mode.
        let message = format!("Error: {e:#}");
        if quiet {
            eprintln!("{message}");
        } else if let Err(display_err) = output.fail(&message) {
            eprintln!("{message}");
            eprintln!("Failed to report error via output handler: {display_err:#}");
        }
        if let Err(finish_err) = output.finish() {
            eprintln!("Failed to flush output handler: {finish_err:#}");
        }

        let exit_code = e.downcast_ref::<GroveError>().map_or(1, GroveError::exit_code);
        process::exit(exit_code);
    }
    Ok(())
}

/// Execute the selected CLI command using the provided output implementation.
fn run(cli: Cli, config: &Config, output: &Arc<dyn Output>) -> Result<()> {
    let git = SystemGit::new(&config.git);
    let cwd = env::current_dir().context("Failed to determine the current directory")?;
    debug!(
        git = %config.git.display(),
        remote = %config.remote,
        cwd = %cwd.display(),
        "resolved configuration"
    );

    match cli.command {
        Commands::Init {
            target,
            convert,
            branches,
        } => {
            let request = InitRequest {
                argument: target,
                convert,
                branches,
            };
            commands::init(&git, output.as_ref(), cwd, &config.remote, &request)
        }
    }
}
