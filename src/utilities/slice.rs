use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args};
use tracing::debug;

use crate::error::Result;
use crate::indexes::IndexSet;
use crate::io::{Output, Source};

use super::{Context, UniformReader, Utility};

/// Return the header and the data rows at the given 0-based indexes
#[derive(Debug, Clone, Default, Args)]
#[command(group(
    ArgGroup::new("selection")
        .args(["indexes", "head", "tail"])
        .required(true)
        .multiple(false)
))]
pub struct Slice {
    /// Comma-delimited indexes and ranges to include, e.g. '0', '0-6,12' or
    /// '0-6,12-'
    #[arg(short = 'i', long = "indexes", value_name = "INDEXES")]
    pub indexes: Option<String>,

    /// Return the header and the first N rows
    #[arg(long = "head", value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub head: Option<u64>,

    /// Return the header and the last N rows
    #[arg(long = "tail", value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub tail: Option<u64>,

    /// The CSV file to operate on. Reads standard input when omitted
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
}

impl UniformReader for Slice {}

impl Utility for Slice {
    fn input_path(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    fn execute(&self, _ctx: &Context, source: Source, output: &mut Output) -> Result<()> {
        // Parse before reading so a bad specification produces no output.
        let index_set = self.indexes.as_deref().map(IndexSet::parse).transpose()?;

        let input = self.read_input(source)?;
        if input.is_empty() {
            return Ok(());
        }
        let mut sink = output.records();
        sink.write_header(&input.column_names)?;

        let rows = input.rows;
        if let Some(set) = index_set {
            let last = set.max_index();
            debug!(?last, "slicing by indexes");
            for (i, row) in rows.enumerate() {
                if last.is_some_and(|last| i > last) {
                    break;
                }
                let row = row?;
                if set.contains(i) {
                    sink.write_record(&row)?;
                }
            }
        } else if let Some(head) = self.head {
            let head = usize::try_from(head).unwrap_or(usize::MAX);
            for row in rows.take(head) {
                sink.write_record(&row?)?;
            }
        } else if let Some(tail) = self.tail {
            let tail = usize::try_from(tail).unwrap_or(usize::MAX);
            let mut kept: VecDeque<Vec<String>> = VecDeque::new();
            for row in rows {
                if kept.len() == tail {
                    kept.pop_front();
                }
                kept.push_back(row?);
            }
            for row in &kept {
                sink.write_record(row)?;
            }
        }
        sink.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::utilities::testing::run_csv;

    fn ids() -> String {
        let mut text = "id\n".to_string();
        for i in 0..10 {
            text.push_str(&format!("{}\n", i));
        }
        text
    }

    fn run(slice: Slice) -> Result<String> {
        run_csv(&slice, Context::default(), &ids())
    }

    fn by_indexes(spec: &str) -> Slice {
        Slice {
            indexes: Some(spec.to_string()),
            ..Slice::default()
        }
    }

    #[test]
    fn indexes_closed_and_open() {
        let out = run(by_indexes("0-2,6-8,7-")).unwrap();
        assert_eq!(out, "id\n0\n1\n2\n6\n7\n8\n9\n");
    }

    #[test]
    fn single_indexes_keep_input_order() {
        let out = run(by_indexes("5,1,3")).unwrap();
        assert_eq!(out, "id\n1\n3\n5\n");
    }

    #[test]
    fn redundant_indexes_print_once() {
        let out = run(by_indexes("9-,8,9,7-,8-")).unwrap();
        assert_eq!(out, "id\n7\n8\n9\n");
    }

    #[test]
    fn bad_index_specs() {
        assert!(matches!(run(by_indexes("6-3")), Err(Error::InvalidRange(_))));
        assert!(matches!(
            run(by_indexes("1,x")),
            Err(Error::IncorrectlyFormatted { .. })
        ));
    }

    #[test]
    fn head() {
        let slice = Slice {
            head: Some(2),
            ..Slice::default()
        };
        assert_eq!(run(slice).unwrap(), "id\n0\n1\n");
    }

    #[test]
    fn tail() {
        let slice = Slice {
            tail: Some(3),
            ..Slice::default()
        };
        assert_eq!(run(slice).unwrap(), "id\n7\n8\n9\n");
    }

    #[test]
    fn huge_tail_keeps_everything() {
        let slice = Slice {
            tail: Some(u64::MAX / 2),
            ..Slice::default()
        };
        assert_eq!(run(slice).unwrap(), ids());
    }

    #[test]
    fn head_longer_than_data() {
        let slice = Slice {
            head: Some(50),
            ..Slice::default()
        };
        assert_eq!(run(slice).unwrap(), ids());
    }

    #[test]
    fn empty_input() {
        let out = run_csv(&by_indexes("1"), Context::default(), "").unwrap();
        assert_eq!(out, "");
    }
}
