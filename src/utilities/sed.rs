use std::path::{Path, PathBuf};

use clap::{ArgAction, Args};
use tracing::debug;

use crate::error::Result;
use crate::io::{Output, Source};
use crate::text::regex_replacement;

use super::matching::{ColumnFilter, LINE_NUMBER_COLUMN, trailing_input};
use super::{Context, UniformReader, Utility};

/// Replace every instance of PATTERN with REPL in the selected columns
#[derive(Debug, Clone, Default, Args)]
pub struct Sed {
    /// A pattern to search for
    #[arg(value_name = "PATTERN")]
    pub pattern: String,

    /// The replacement. Regex group references may be written \1 or \g<name>.
    /// Escape a leading hyphen as \-
    #[arg(value_name = "REPL")]
    pub replacement: String,

    /// The CSV file to operate on. Reads standard input when omitted
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Comma-separated column indexes, names or ranges to affect, e.g.
    /// '1,id,3-5'. Defaults to all columns
    #[arg(short = 'c', long = "columns", value_name = "COLUMNS")]
    pub columns: Option<String>,

    /// Match PATTERN literally instead of as a regular expression
    #[arg(short = 'm', long = "match-literal")]
    pub literal: bool,

    /// Only return rows in which PATTERN matched
    #[arg(short = 'F', long = "filter")]
    pub filter: bool,

    /// An additional expression, applied after the previous ones. COLUMNS
    /// defaults to the -c selection
    #[arg(
        short = 'E',
        long = "expr",
        num_args = 2..=3,
        action = ArgAction::Append,
        value_names = ["PATTERN", "REPL", "COLUMNS"]
    )]
    pub expressions: Vec<Vec<String>>,

    /// Insert a column of line numbers at the front of the output
    #[arg(short = 'l', long = "linenumbers")]
    pub line_numbers: bool,
}

struct Substitution {
    target: ColumnFilter,
    replacement: String,
}

impl Sed {
    /// Every expression as (pattern, replacement, columns), positional first.
    fn expressions(&self) -> Vec<(&str, &str, &str)> {
        let default_columns = self.columns.as_deref().unwrap_or("");
        let swallowed_input = self.input.is_none() && trailing_input(&self.expressions, 3).is_some();

        let mut exprs = vec![(
            self.pattern.as_str(),
            self.replacement.as_str(),
            default_columns,
        )];
        let count = self.expressions.len();
        for (i, expr) in self.expressions.iter().enumerate() {
            let columns = match expr.get(2) {
                Some(_) if swallowed_input && i + 1 == count => default_columns,
                Some(columns) => columns.as_str(),
                None => default_columns,
            };
            exprs.push((expr[0].as_str(), expr[1].as_str(), columns));
        }
        exprs
    }

    fn substitutions(&self, column_names: &[String], offset: usize) -> Result<Vec<Substitution>> {
        self.expressions()
            .into_iter()
            .map(|(pattern, replacement, columns)| {
                let target = ColumnFilter::new(pattern, self.literal, columns, column_names, offset)?;
                let replacement = replacement.strip_prefix(r"\-").map_or_else(
                    || replacement.to_string(),
                    |rest| format!("-{}", rest),
                );
                let replacement = if self.literal {
                    replacement
                } else {
                    regex_replacement(&replacement)
                };
                Ok(Substitution {
                    target,
                    replacement,
                })
            })
            .collect()
    }
}

impl UniformReader for Sed {}

impl Utility for Sed {
    fn input_path(&self) -> Option<&Path> {
        self.input
            .as_deref()
            .or_else(|| trailing_input(&self.expressions, 3).map(Path::new))
    }

    fn execute(&self, ctx: &Context, source: Source, output: &mut Output) -> Result<()> {
        let input = self.read_input(source)?;
        if input.is_empty() {
            return Ok(());
        }
        let substitutions = self.substitutions(&input.column_names, ctx.column_offset)?;
        debug!(expressions = substitutions.len(), "compiled substitutions");

        let mut header = input.column_names;
        if self.line_numbers {
            header.insert(0, LINE_NUMBER_COLUMN.to_string());
        }
        let mut sink = output.records();
        sink.write_header(&header)?;

        for (n, row) in input.rows.enumerate() {
            let mut row = row?;
            if self.filter && !substitutions[0].target.test(&row, true, false) {
                continue;
            }
            for (column, cell) in row.iter_mut().enumerate() {
                for sub in &substitutions {
                    if sub.target.columns.contains(column) {
                        *cell = sub
                            .target
                            .matcher
                            .replace_all(cell, &sub.replacement)
                            .into_owned();
                    }
                }
            }
            if self.line_numbers {
                row.insert(0, (n + 1).to_string());
            }
            sink.write_record(&row)?;
        }
        sink.finish()
    }
}
