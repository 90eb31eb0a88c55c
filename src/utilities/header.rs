use std::iter;
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args};
use regex::Regex;
use tracing::debug;

use crate::columns::resolve_columns;
use crate::error::{Error, Result};
use crate::io::{Input, Output, Source};
use crate::parser::split_delimited;
use crate::text::{regex_replacement, slugify};

use super::{Context, UniformReader, Utility};

/// Print or transform the header row of a CSV file
#[derive(Debug, Clone, Default, Args)]
#[command(group(
    ArgGroup::new("new_header")
        .args(["add", "add_x", "generic", "generic_x"])
        .multiple(false)
))]
pub struct Header {
    /// Add a header row of column names using a comma-delimited string,
    /// e.g. 'ID,cost,"name, proper"'. The input is assumed to have no header
    #[arg(short = 'A', long = "add", value_name = "COLUMN_NAMES")]
    pub add: Option<String>,

    /// Replace the existing header row with a comma-delimited string of
    /// column names
    #[arg(long = "AX", visible_alias = "add-x", value_name = "COLUMN_NAMES")]
    pub add_x: Option<String>,

    /// Add a header row of generic, numbered column names: field_1, field_2,
    /// and so on. The input is assumed to have no header
    #[arg(short = 'G', long = "generic")]
    pub generic: bool,

    /// Replace the existing header row with generic column names
    #[arg(long = "GX", visible_alias = "generic-x")]
    pub generic_x: bool,

    /// Rename columns with comma-delimited 'column|new name' pairs, e.g.
    /// 'a|Apples,2|hello,3|world'
    #[arg(short = 'R', long = "rename", value_name = "PAIRS")]
    pub rename: Option<String>,

    /// Convert column names to snake_case
    #[arg(short = 'S', long = "slugify")]
    pub slugify: bool,

    /// Replace every match of PATTERN in the column names with REPLACEMENT
    #[arg(short = 'X', long = "regex", num_args = 2, value_names = ["PATTERN", "REPLACEMENT"])]
    pub regex: Option<Vec<String>>,

    /// Print only the resulting header as an index listing
    #[arg(short = 'P', long = "preview")]
    pub preview: bool,

    /// The CSV file to operate on. Reads standard input when omitted
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
}

impl Header {
    /// True when the first row is data rather than a header.
    fn headless_input(&self) -> bool {
        self.generic || self.add.is_some()
    }

    fn custom_names(&self) -> Option<&str> {
        self.add.as_deref().or(self.add_x.as_deref())
    }

    fn modifies_header(&self) -> bool {
        self.custom_names().is_some()
            || self.generic
            || self.generic_x
            || self.rename.is_some()
            || self.slugify
            || self.regex.is_some()
    }

    fn new_header(&self, ctx: &Context, mut names: Vec<String>) -> Result<Vec<String>> {
        if let Some(custom) = self.custom_names() {
            let parsed = split_delimited(custom, ',', 0, None);
            if parsed.len() != names.len() {
                return Err(Error::ColumnIdentifier(format!(
                    "The data has {} columns, but {} column names were parsed from: `{}`",
                    names.len(),
                    parsed.len(),
                    custom
                )));
            }
            names = parsed;
        } else if self.generic || self.generic_x {
            names = (0..names.len())
                .map(|i| format!("field_{}", i + ctx.column_offset))
                .collect();
        }

        if let Some(pairs) = &self.rename {
            for pair in split_delimited(pairs, ',', 0, None) {
                let Some((column, new_name)) = pair.split_once('|') else {
                    return Err(Error::ColumnIdentifier(format!(
                        "Rename pairs must be written as 'column|new name', got: {}",
                        pair
                    )));
                };
                let ids = resolve_columns(column, &names, ctx.column_offset, None)?;
                if ids.len() != 1 {
                    return Err(Error::ColumnIdentifier(format!(
                        "{} is expected to refer to exactly 1 column name/id, but found: {}",
                        column,
                        ids.len()
                    )));
                }
                names[ids.as_slice()[0]] = new_name.to_string();
            }
        }

        if let Some(args) = &self.regex {
            let (pattern, replacement) = (&args[0], &args[1]);
            let re = Regex::new(pattern).map_err(|source| Error::Regex {
                pattern: pattern.clone(),
                source,
            })?;
            let replacement = regex_replacement(replacement);
            for name in names.iter_mut() {
                *name = re.replace_all(name, replacement.as_str()).into_owned();
            }
        }

        if self.slugify {
            for name in names.iter_mut() {
                *name = slugify(name);
            }
        }
        Ok(names)
    }
}

impl UniformReader for Header {
    fn read_input(&self, source: Source) -> Result<Input> {
        let mut rows = source.records()?;
        let Some(first) = rows.next().transpose()? else {
            return Ok(Input::empty());
        };
        if self.headless_input() {
            // Stand-in names; the first row goes back into the data.
            Ok(Input {
                column_names: first.clone(),
                rows: Box::new(iter::once(Ok(first)).chain(rows)),
            })
        } else {
            Ok(Input {
                column_names: first,
                rows,
            })
        }
    }
}

impl Utility for Header {
    fn input_path(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    fn execute(&self, ctx: &Context, source: Source, output: &mut Output) -> Result<()> {
        let input = self.read_input(source)?;
        if input.is_empty() {
            return Ok(());
        }
        let Input { column_names, rows } = input;
        let names = self.new_header(ctx, column_names)?;
        debug!(columns = names.len(), "prepared header");

        let mut sink = output.records();
        if self.preview || !self.modifies_header() {
            sink.write_header(&["index".to_string(), "field".to_string()])?;
            for (i, name) in names.iter().enumerate() {
                sink.write_record(&[(i + ctx.column_offset).to_string(), name.clone()])?;
            }
        } else {
            sink.write_header(&names)?;
            for row in rows {
                sink.write_record(&row?)?;
            }
        }
        sink.finish()
    }
}
