//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// vtrace - causal layout of vector-clock annotated logs.
#[derive(Parser, Debug, Clone)]
#[command(name = "vtrace")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Parse a log and print its causal layout.
    Layout(LayoutArgs),

    /// List the entries of an example catalog.
    Examples(CatalogArgs),
}

/// Arguments for the layout command.
#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    /// Log file to read. Defaults to the file of `--example`.
    pub file: Option<PathBuf>,

    /// Event pattern with `clock`, `host` and `event` groups.
    #[arg(short, long, env = "VTRACE_PATTERN")]
    pub pattern: Option<String>,

    /// Execution delimiter pattern, optionally with a `trace` group.
    #[arg(short, long, env = "VTRACE_DELIMITER")]
    pub delimiter: Option<String>,

    /// Take the log format (and file) from a catalog entry.
    #[arg(long, value_name = "NAME")]
    pub example: Option<String>,

    /// Example catalog to look `--example` up in.
    #[arg(long, env = "VTRACE_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Only lay out the execution with this label.
    #[arg(short, long, value_name = "LABEL")]
    pub execution: Option<String>,

    /// Select nodes on these hosts (repeatable).
    #[arg(long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,

    /// Select nodes whose text contains this substring.
    #[arg(long, value_name = "TEXT")]
    pub contains: Option<String>,

    /// Tolerate clock values that no logged event carries.
    #[arg(long)]
    pub lenient: bool,
}

impl LayoutArgs {
    /// Returns true if a node selection was requested.
    #[must_use]
    pub fn has_selection(&self) -> bool {
        !self.hosts.is_empty() || self.contains.is_some()
    }
}

/// Arguments naming an example catalog.
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Example catalog to read.
    #[arg(long, env = "VTRACE_CATALOG")]
    pub catalog: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layout_with_selection() {
        let cli = Cli::parse_from([
            "vtrace", "layout", "run.log", "--host", "a", "--host", "b", "--contains", "send",
        ]);
        let Commands::Layout(args) = cli.command else {
            panic!("expected layout command");
        };
        assert_eq!(args.file, Some(PathBuf::from("run.log")));
        assert_eq!(args.hosts, ["a", "b"]);
        assert_eq!(args.contains.as_deref(), Some("send"));
        assert!(args.has_selection());
        assert!(!args.lenient);
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from(["vtrace", "examples", "--format", "json", "-v"]);
        assert_eq!(cli.format, Format::Json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Examples(_)));
    }

    #[test]
    fn layout_file_is_optional() {
        let cli = Cli::parse_from(["vtrace", "layout", "--example", "ping"]);
        let Commands::Layout(args) = cli.command else {
            panic!("expected layout command");
        };
        assert!(args.file.is_none());
        assert_eq!(args.example.as_deref(), Some("ping"));
        assert!(!args.has_selection());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
