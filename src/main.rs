//! Entry point for the `cmk` command.
//!
//! Parses the command line, opens the input, runs the chosen utility and
//! maps failures to exit codes: 2 for usage errors, 1 for everything else.
//! A closed stdout (e.g. piping into `head`) ends the run quietly.

use std::io::{self, BufWriter, IsTerminal, Write};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand, error::ErrorKind};
use tracing::debug;
use yansi::Paint;

use csvmedkit::error::Error;
use csvmedkit::io::{CommonArgs, Output, Source};
use csvmedkit::logging::{self, LogFormat};
use csvmedkit::utilities::{Context, Flatten, Header, Norm, Pivot, Rgrep, Sed, Slice, Utility};

#[derive(Parser)]
#[command(name = "cmk", version, propagate_version = true)]
#[command(about = "Utilities for cleaning, reshaping and inspecting CSV data")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print or transform the header row of a CSV file
    Header(Header),
    /// Pivot and aggregate rows into a summary table
    Pivot(Pivot),
    /// Return the header and a subset of data rows
    Slice(Slice),
    /// Replace text matching a pattern in the selected columns
    Sed(Sed),
    /// Print each record as one row per field
    Flatten(Flatten),
    /// Normalize whitespace and case in the selected columns
    Norm(Norm),
    /// Select rows that match one or more patterns
    Rgrep(Rgrep),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Header(_) => "header",
            Commands::Pivot(_) => "pivot",
            Commands::Slice(_) => "slice",
            Commands::Sed(_) => "sed",
            Commands::Flatten(_) => "flatten",
            Commands::Norm(_) => "norm",
            Commands::Rgrep(_) => "rgrep",
        }
    }

    fn utility(&self) -> &dyn Utility {
        match self {
            Commands::Header(u) => u,
            Commands::Pivot(u) => u,
            Commands::Slice(u) => u,
            Commands::Sed(u) => u,
            Commands::Flatten(u) => u,
            Commands::Norm(u) => u,
            Commands::Rgrep(u) => u,
        }
    }
}

fn try_main(cli: &Cli) -> Result<()> {
    let dialect = cli.common.dialect()?;
    let ctx = Context {
        column_offset: cli.common.column_offset(),
    };
    let utility = cli.command.utility();

    let path = utility.input_path();
    debug!(input = ?path, offset = ctx.column_offset, "opening input");
    let source = Source::open(dialect, path).with_context(|| match path {
        Some(path) => format!("failed to open {}", path.display()),
        None => "failed to read standard input".to_string(),
    })?;

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    {
        let mut output = Output::new(&mut writer, cli.common.output_format());
        utility.execute(&ctx, source, &mut output)?;
    }
    writer.flush()?;
    Ok(())
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.downcast_ref::<Error>().is_some_and(Error::is_broken_pipe)
            || cause
                .downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

/// A usage error rendered against the subcommand that raised it.
fn usage_error(command: &Commands, message: &str) -> clap::Error {
    let mut cli = Cli::command();
    cli.build();
    match cli.find_subcommand_mut(command.name()) {
        Some(sub) => sub.error(ErrorKind::ArgumentConflict, message),
        None => cli.error(ErrorKind::ArgumentConflict, message),
    }
}

fn report(command: &Commands, err: anyhow::Error) -> ExitCode {
    if is_broken_pipe(&err) {
        return ExitCode::SUCCESS;
    }
    if let Some(Error::Usage(message)) = err.downcast_ref::<Error>() {
        usage_error(command, message).exit();
    }
    if !io::stderr().is_terminal() {
        yansi::disable();
    }
    eprintln!("{} {:#}", "error:".red().bold(), err);
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match LogFormat::from_env() {
        Ok(format) => {
            logging::init_logging(cli.common.verbose, format);
        }
        Err(err) => return report(&cli.command, err.into()),
    }

    match try_main(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&cli.command, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["cmk", "slice", "--head", "2", "-t", "--zero", "data.tsv"])
            .unwrap();
        assert!(cli.common.tabs);
        assert_eq!(cli.common.column_offset(), 0);
        assert!(matches!(cli.command, Commands::Slice(_)));
        assert_eq!(
            cli.command.utility().input_path(),
            Some(std::path::Path::new("data.tsv"))
        );
    }

    #[test]
    fn slice_needs_exactly_one_mode() {
        assert!(Cli::try_parse_from(["cmk", "slice", "f.csv"]).is_err());
        assert!(Cli::try_parse_from(["cmk", "slice", "--head", "1", "--tail", "1"]).is_err());
        assert!(Cli::try_parse_from(["cmk", "slice", "--head", "0"]).is_err());
    }

    #[test]
    fn repeated_expressions() {
        let cli = Cli::try_parse_from([
            "cmk", "sed", "a", "b", "-E", "c", "d", "-E", "e", "f", "1", "--", "in.csv",
        ])
        .unwrap();
        let Commands::Sed(sed) = cli.command else {
            panic!("expected sed");
        };
        assert_eq!(sed.expressions.len(), 2);
        assert_eq!(sed.expressions[1], vec!["e", "f", "1"]);
    }

    #[test]
    fn lowercase_conflicts_with_uppercase() {
        assert!(Cli::try_parse_from(["cmk", "norm", "-L", "-U"]).is_err());
    }

    #[test]
    fn usage_errors_name_the_subcommand() {
        let err = usage_error(&Commands::Pivot(Pivot::default()), "bad aggregation");
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        let text = err.to_string();
        assert!(text.contains("bad aggregation"));
        assert!(text.contains("cmk pivot"));
    }

    #[test]
    fn broken_pipe_detection() {
        let err = anyhow::Error::new(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert!(is_broken_pipe(&err));
        let err = anyhow::Error::new(Error::Usage("x".to_string()));
        assert!(!is_broken_pipe(&err));
    }
}
