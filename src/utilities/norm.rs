use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use crate::columns::resolve_columns;
use crate::error::Result;
use crate::io::{Output, Source};
use crate::text::{normalize, slugify};

use super::{Context, UniformReader, Utility};

/// Normalize whitespace and case in the selected columns
#[derive(Debug, Clone, Default, Args)]
pub struct Norm {
    /// Comma-separated column indexes, names or ranges to normalize.
    /// Defaults to all columns
    #[arg(short = 'c', long = "columns", value_name = "COLUMNS")]
    pub columns: Option<String>,

    /// Convert values to snake_case
    #[arg(short = 'S', long = "slugify")]
    pub slugify: bool,

    /// Convert values to lowercase
    #[arg(short = 'L', long = "lowercase", conflicts_with = "uppercase")]
    pub lowercase: bool,

    /// Convert values to uppercase
    #[arg(short = 'U', long = "uppercase")]
    pub uppercase: bool,

    /// Keep line breaks instead of folding them into spaces
    #[arg(long = "keep-lines")]
    pub keep_lines: bool,

    /// The CSV file to operate on. Reads standard input when omitted
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
}

impl Norm {
    fn transform(&self, value: &str) -> String {
        let value = normalize(value, self.keep_lines);
        if self.slugify {
            slugify(&value)
        } else if self.lowercase {
            value.to_lowercase()
        } else if self.uppercase {
            value.to_uppercase()
        } else {
            value
        }
    }
}

impl UniformReader for Norm {}

impl Utility for Norm {
    fn input_path(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    fn execute(&self, ctx: &Context, source: Source, output: &mut Output) -> Result<()> {
        let input = self.read_input(source)?;
        if input.is_empty() {
            return Ok(());
        }
        let columns = resolve_columns(
            self.columns.as_deref().unwrap_or(""),
            &input.column_names,
            ctx.column_offset,
            None,
        )?;
        debug!(columns = ?columns.as_slice(), "normalizing columns");

        let mut sink = output.records();
        sink.write_header(&input.column_names)?;
        for row in input.rows {
            let mut row = row?;
            for (i, cell) in row.iter_mut().enumerate() {
                if columns.contains(i) {
                    *cell = self.transform(cell);
                }
            }
            sink.write_record(&row)?;
        }
        sink.finish()
    }
}
