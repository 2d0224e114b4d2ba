//! vtrace CLI binary entrypoint.
//!
//! This is the main entry point for the `vtrace` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vtrace_cli::cli::{Cli, Commands};
use vtrace_cli::commands::{ExamplesCommand, LayoutCommand};
use vtrace_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), vtrace_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Layout(args) => {
            let cmd = LayoutCommand::new(args.catalog.as_deref());
            cmd.execute(&mut stdout, &format, &args)?;
        }
        Commands::Examples(args) => {
            let cmd = ExamplesCommand::new(args.catalog.as_deref());
            cmd.execute(&mut stdout, &format)?;
        }
    }

    Ok(())
}
