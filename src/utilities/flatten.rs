use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use crossterm::terminal;
use tracing::debug;

use crate::error::Result;
use crate::io::{Output, OutputFormat, Source};
use crate::text::wrap;

use super::{Context, UniformReader, Utility};

const DEFAULT_SEPARATOR_CHAR: char = '=';
const DEFAULT_MAX_LENGTH: usize = 50;
const FLAT_COLUMN_PADDING: usize = 4;
const FLAT_COLUMN_WIDTH: usize = "field".len() + FLAT_COLUMN_PADDING;
const RECID_COLUMN: &str = "recid";

/// Print each record as one row per field: a transposed, vertical view
#[derive(Debug, Clone, Default, Args)]
pub struct Flatten {
    /// Print output in CSV format instead of an aligned table
    #[arg(short = 'c', long = "csv")]
    pub csv: bool,

    /// Split values longer than N characters into multiple rows. 0 disables
    /// wrapping
    #[arg(short = 'L', long = "max-length", value_name = "N")]
    pub max_length: Option<usize>,

    /// Include a `recid` column holding the index of each record. Disables
    /// the default record separator
    #[arg(short = 'R', long = "rec-id")]
    pub rec_ids: bool,

    /// Label the continuation rows of a split value as `name__1`, `name__2`,
    /// ... instead of leaving the field blank
    #[arg(short = 'B', long = "label-chunks")]
    pub label_chunks: bool,

    /// Separate records with a blank row
    #[arg(short = 'N', long = "newline-sep", conflicts_with = "separator")]
    pub newline_separator: bool,

    /// Separate records with a row holding this marker in the `field` column.
    /// Defaults to a line of '='. Use "none" or "" to disable
    #[arg(short = 'S', long = "separator", value_name = "TEXT_MARKER")]
    pub separator: Option<String>,

    /// The CSV file to operate on. Reads standard input when omitted
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
}

impl Flatten {
    fn output_header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(3);
        if self.rec_ids {
            header.push(RECID_COLUMN.to_string());
        }
        header.push("field".to_string());
        header.push("value".to_string());
        header
    }

    fn record_separator(&self, max_name_length: usize) -> Option<String> {
        if self.newline_separator {
            return Some(String::new());
        }
        match self.separator.as_deref() {
            Some("none") | Some("") => None,
            Some(marker) => Some(marker.to_string()),
            None if self.rec_ids => None,
            None => Some(DEFAULT_SEPARATOR_CHAR.to_string().repeat(max_name_length)),
        }
    }

    /// Width values are wrapped to; `None` splits on line breaks only.
    fn wrap_width(&self, pretty: bool, column_count: usize, max_name_length: usize) -> Option<usize> {
        match self.max_length {
            Some(0) => None,
            Some(n) => Some(n),
            None if pretty => {
                let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
                Some(auto_max_length(width, column_count, max_name_length))
            }
            None => None,
        }
    }

    fn flat_rows(
        &self,
        column_names: &[String],
        rows: impl Iterator<Item = Result<Vec<String>>>,
        separator: Option<&str>,
        max_length: Option<usize>,
    ) -> Result<Vec<Vec<String>>> {
        let mut out = Vec::new();
        for (record, row) in rows.enumerate() {
            let row = row?;
            let lead: Vec<String> = if self.rec_ids {
                vec![record.to_string()]
            } else {
                Vec::new()
            };

            if let Some(marker) = separator
                && record > 0
            {
                let mut sep = if self.rec_ids { vec![String::new()] } else { Vec::new() };
                sep.push(marker.to_string());
                sep.push(String::new());
                out.push(sep);
            }

            for (i, name) in column_names.iter().enumerate() {
                let value = row.get(i).map_or("", |v| v.trim());
                let mut chunks: Vec<String> = match max_length {
                    Some(width) => wrap(value, width),
                    None => value.lines().map(str::to_string).collect(),
                };
                if chunks.is_empty() {
                    chunks.push(String::new());
                }
                for (n, chunk) in chunks.into_iter().enumerate() {
                    let field = if n == 0 {
                        name.clone()
                    } else if self.label_chunks {
                        format!("{}__{}", name, n)
                    } else {
                        String::new()
                    };
                    let mut flat = lead.clone();
                    flat.push(field);
                    flat.push(chunk);
                    out.push(flat);
                }
            }
        }
        Ok(out)
    }
}

/// Room left for values once the other flat columns and the longest field
/// name have been laid out on a terminal `term_width` characters wide.
fn auto_max_length(term_width: usize, column_count: usize, max_name_length: usize) -> usize {
    let used = FLAT_COLUMN_WIDTH * column_count.saturating_sub(1) + max_name_length + FLAT_COLUMN_PADDING;
    match term_width.checked_sub(used) {
        Some(available) if available > FLAT_COLUMN_PADDING => available,
        _ => DEFAULT_MAX_LENGTH,
    }
}

struct Cell<'a> {
    text: &'a str,
    width: usize,
}

fn cells(row: &[String]) -> Vec<Cell<'_>> {
    row.iter()
        .map(|text| Cell {
            text,
            width: text.chars().count(),
        })
        .collect()
}

fn write_row(out: &mut dyn Write, row: &[Cell], widths: &[usize], numeric: &[bool]) -> Result<()> {
    let mut line = String::from("|");
    for (i, width) in widths.iter().enumerate() {
        let (text, used) = row.get(i).map_or(("", 0), |c| (c.text, c.width));
        let padding = " ".repeat(width.saturating_sub(used));
        if numeric.get(i).copied().unwrap_or(false) {
            line.push_str(&format!(" {}{} |", padding, text));
        } else {
            line.push_str(&format!(" {}{} |", text, padding));
        }
    }
    writeln!(out, "{}", line)?;
    Ok(())
}

/// Write `rows` as a Markdown-style table. `numeric` columns are
/// right-aligned.
fn print_table(
    out: &mut dyn Write,
    header: &[String],
    rows: &[Vec<String>],
    numeric: &[bool],
) -> Result<()> {
    let header_cells = cells(header);
    let body: Vec<Vec<Cell>> = rows.iter().map(|r| cells(r)).collect();

    let mut widths: Vec<usize> = header_cells.iter().map(|c| c.width).collect();
    for row in &body {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.width);
            }
        }
    }

    write_row(out, &header_cells, &widths, numeric)?;
    let divider: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "| {} |", divider.join(" | "))?;
    for row in &body {
        write_row(out, row, &widths, numeric)?;
    }
    Ok(())
}

impl UniformReader for Flatten {}

impl Utility for Flatten {
    fn input_path(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    fn execute(&self, _ctx: &Context, source: Source, output: &mut Output) -> Result<()> {
        let input = self.read_input(source)?;
        if input.is_empty() {
            return Ok(());
        }
        let header = self.output_header();
        let max_name_length = input
            .column_names
            .iter()
            .chain(header.iter())
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0);

        let pretty = !self.csv && output.format() != OutputFormat::Json;
        let max_length = self.wrap_width(pretty, header.len(), max_name_length);
        let separator = self.record_separator(max_name_length);
        debug!(?max_length, ?separator, pretty, "flattening records");

        let rows = self.flat_rows(
            &input.column_names,
            input.rows,
            separator.as_deref(),
            max_length,
        )?;

        if pretty {
            let numeric: Vec<bool> = header.iter().map(|h| h == RECID_COLUMN).collect();
            print_table(output.text(), &header, &rows, &numeric)
        } else {
            let mut sink = output.records();
            sink.write_header(&header)?;
            for row in &rows {
                sink.write_record(row)?;
            }
            sink.finish()
        }
    }
}
