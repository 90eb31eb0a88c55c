use std::path::{Path, PathBuf};

use clap::{ArgAction, Args};
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::{Output, Source};

use super::matching::{ColumnFilter, LINE_NUMBER_COLUMN, trailing_input};
use super::{Context, UniformReader, Utility};

/// Select rows that match one or more patterns
#[derive(Debug, Clone, Default, Args)]
pub struct Rgrep {
    /// A pattern to search for
    #[arg(value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// The CSV file to operate on. Reads standard input when omitted
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Display column names and indices from the input CSV, then exit
    #[arg(short = 'n', long = "names")]
    pub names: bool,

    /// Comma-separated column indexes, names or ranges to search, e.g.
    /// '1,id,3-5'. Defaults to all columns
    #[arg(short = 'c', long = "columns", value_name = "COLUMNS")]
    pub columns: Option<String>,

    /// An additional pattern that rows must also match. COLUMNS defaults to
    /// the -c selection
    #[arg(
        short = 'E',
        long = "expr",
        num_args = 1..=2,
        action = ArgAction::Append,
        value_names = ["PATTERN", "COLUMNS"]
    )]
    pub expressions: Vec<Vec<String>>,

    /// Match patterns literally instead of as regular expressions
    #[arg(short = 'm', long = "literal-match")]
    pub literal: bool,

    /// Select non-matching instead of matching rows
    #[arg(short = 'i', long = "invert-match")]
    pub invert: bool,

    /// Only select rows in which every searched column matches
    #[arg(short = 'a', long = "all-match")]
    pub all_match: bool,

    /// Insert a column of line numbers at the front of the output
    #[arg(short = 'l', long = "linenumbers")]
    pub line_numbers: bool,
}

impl Rgrep {
    fn swallowed_input(&self) -> bool {
        self.input.is_none() && trailing_input(&self.expressions, 2).is_some()
    }

    fn filters(&self, column_names: &[String], offset: usize) -> Result<Vec<ColumnFilter>> {
        let Some(pattern) = self.pattern.as_deref() else {
            return Err(missing_pattern());
        };
        let default_columns = self.columns.as_deref().unwrap_or("");
        let swallowed = self.swallowed_input();
        let count = self.expressions.len();

        let mut filters = vec![ColumnFilter::new(
            pattern,
            self.literal,
            default_columns,
            column_names,
            offset,
        )?];
        for (i, expr) in self.expressions.iter().enumerate() {
            let columns = match expr.get(1) {
                Some(_) if swallowed && i + 1 == count => default_columns,
                Some(columns) => columns.as_str(),
                None => default_columns,
            };
            filters.push(ColumnFilter::new(
                &expr[0],
                self.literal,
                columns,
                column_names,
                offset,
            )?);
        }
        Ok(filters)
    }

    fn print_names(&self, ctx: &Context, column_names: &[String], output: &mut Output) -> Result<()> {
        let out = output.text();
        for (i, name) in column_names.iter().enumerate() {
            writeln!(out, "{:>3}: {}", i + ctx.column_offset, name)?;
        }
        Ok(())
    }
}

fn missing_pattern() -> Error {
    Error::Usage("Must provide a [PATTERN] argument, e.g. `cmk rgrep '[a-z]+' data.csv`".to_string())
}

impl UniformReader for Rgrep {}

impl Utility for Rgrep {
    fn input_path(&self) -> Option<&Path> {
        if let Some(path) = self.input.as_deref() {
            return Some(path);
        }
        if self.names {
            // With --names the lone positional is the file.
            return self.pattern.as_deref().map(Path::new);
        }
        trailing_input(&self.expressions, 2).map(Path::new)
    }

    fn execute(&self, ctx: &Context, source: Source, output: &mut Output) -> Result<()> {
        if !self.names && self.pattern.is_none() {
            return Err(missing_pattern());
        }
        let input = self.read_input(source)?;
        if self.names {
            return self.print_names(ctx, &input.column_names, output);
        }
        if input.is_empty() {
            return Ok(());
        }

        let filters = self.filters(&input.column_names, ctx.column_offset)?;
        let any_match = !self.all_match;
        debug!(expressions = filters.len(), any_match, invert = self.invert, "filtering rows");

        let mut header = input.column_names;
        if self.line_numbers {
            header.insert(0, LINE_NUMBER_COLUMN.to_string());
        }
        let mut sink = output.records();
        sink.write_header(&header)?;

        for (n, row) in input.rows.enumerate() {
            let mut row = row?;
            if !filters.iter().all(|f| f.test(&row, any_match, self.invert)) {
                continue;
            }
            if self.line_numbers {
                row.insert(0, (n + 1).to_string());
            }
            sink.write_record(&row)?;
        }
        sink.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::testing::{run_csv, zero_based};

    const DATA: &str = "name,city,team\nJoe,Boston,red\nJane,Austin,blue\nBob,Denver,red\n";

    fn rgrep(pattern: &str) -> Rgrep {
        Rgrep {
            pattern: Some(pattern.to_string()),
            ..Rgrep::default()
        }
    }

    fn run(rgrep: Rgrep) -> String {
        run_csv(&rgrep, Context::default(), DATA).unwrap()
    }

    #[test]
    fn any_column_matches() {
        assert_eq!(
            run(rgrep("^B")),
            "name,city,team\nJoe,Boston,red\nBob,Denver,red\n"
        );
    }

    #[test]
    fn restricted_columns() {
        let mut r = rgrep("^B");
        r.columns = Some("name".to_string());
        assert_eq!(run(r), "name,city,team\nBob,Denver,red\n");
    }

    #[test]
    fn every_expression_must_pass() {
        let mut r = rgrep("red");
        r.expressions = vec![vec!["^J".to_string(), "1".to_string()]];
        assert_eq!(run(r), "name,city,team\nJoe,Boston,red\n");
    }

    #[test]
    fn expression_defaults_to_columns_option() {
        let mut r = rgrep("e");
        r.columns = Some("city".to_string());
        r.expressions = vec![vec!["n".to_string()]];
        assert_eq!(run(r), "name,city,team\nBob,Denver,red\n");
    }

    #[test]
    fn inverted() {
        let mut r = rgrep("red");
        r.invert = true;
        assert_eq!(run(r), "name,city,team\nJane,Austin,blue\n");
    }

    #[test]
    fn all_match() {
        let mut r = rgrep("o");
        r.all_match = true;
        r.columns = Some("1-2".to_string());
        assert_eq!(run(r), "name,city,team\nJoe,Boston,red\n");
    }

    #[test]
    fn literal() {
        let data = "a\nx.y\nxzy\n";
        let mut r = rgrep("x.y");
        r.literal = true;
        assert_eq!(run_csv(&r, Context::default(), data).unwrap(), "a\nx.y\n");
    }

    #[test]
    fn line_numbers() {
        let mut r = rgrep("Denver");
        r.line_numbers = true;
        assert_eq!(run(r), "line_number,name,city,team\n3,Bob,Denver,red\n");
    }

    #[test]
    fn lists_names() {
        let r = Rgrep {
            names: true,
            ..Rgrep::default()
        };
        assert_eq!(run(r), "  1: name\n  2: city\n  3: team\n");
        let r = Rgrep {
            names: true,
            ..Rgrep::default()
        };
        assert_eq!(
            run_csv(&r, zero_based(), DATA).unwrap(),
            "  0: name\n  1: city\n  2: team\n"
        );
    }

    #[test]
    fn names_mode_reads_pattern_as_file() {
        let r = Rgrep {
            names: true,
            pattern: Some("data.csv".to_string()),
            ..Rgrep::default()
        };
        assert_eq!(r.input_path(), Some(Path::new("data.csv")));
    }

    #[test]
    fn pattern_is_required() {
        let err = run_csv(&Rgrep::default(), Context::default(), DATA).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }
}
