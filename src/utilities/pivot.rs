use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use crate::aggregate::{Aggregation, dispatch};
use crate::aggy::{AggregationKind, Aggy};
use crate::columns::resolve_columns;
use crate::error::{Error, Result};
use crate::io::{Output, RecordSink, Source};
use crate::table::{CastOptions, Datum, Table};

use super::{Context, UniformReader, Utility};

/// Do a simple pivot table, by row, column, or row and column
#[derive(Debug, Clone, Default, Args)]
pub struct Pivot {
    /// The column name(s) to use as pivot rows: a comma-separated list of
    /// names or indices
    #[arg(short = 'r', long = "pivot-rows", value_name = "COLUMNS")]
    pub pivot_rows: Option<String>,

    /// A column name or index whose values become the output columns. Only
    /// one is allowed
    #[arg(short = 'c', long = "pivot-column", value_name = "COLUMN")]
    pub pivot_column: Option<String>,

    /// An aggregation to perform on each group, e.g. "sum:age",
    /// "count:name,hello" or "mean:age|Average age". Repeatable
    #[arg(short = 'a', long = "agg", value_name = "AGGREGATION")]
    pub aggregations: Vec<String>,

    /// List the available aggregate functions
    #[arg(long = "list-aggs")]
    pub list_aggs: bool,

    /// A strftime date format string like "%m/%d/%Y"
    #[arg(long = "date-format")]
    pub date_format: Option<String>,

    /// A strftime datetime format string like "%m/%d/%Y %I:%M %p"
    #[arg(long = "datetime-format")]
    pub datetime_format: Option<String>,

    /// Disable type inference when parsing the input
    #[arg(short = 'I', long = "no-inference")]
    pub no_inference: bool,

    /// The CSV file to operate on. Reads standard input when omitted
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
}

impl Pivot {
    fn cast_options(&self) -> CastOptions {
        CastOptions {
            date_format: self.date_format.clone(),
            datetime_format: self.datetime_format.clone(),
            no_inference: self.no_inference,
        }
    }

    fn wants_listing(&self) -> bool {
        self.list_aggs || self.aggregations.first().is_some_and(String::is_empty)
    }

    fn parse_aggregations(&self) -> Result<Vec<Aggy>> {
        if self.aggregations.is_empty() {
            return Ok(vec![Aggy::new(AggregationKind::Count, Vec::new(), None)]);
        }
        self.aggregations.iter().map(|a| Aggy::parse(a)).collect()
    }

    fn check_options(&self) -> Result<()> {
        if self.pivot_rows.is_none() && self.pivot_column.is_none() {
            return Err(Error::Usage(
                "Either -r/--pivot-rows or -c/--pivot-column must be specified. Both cannot be left unspecified."
                    .to_string(),
            ));
        }
        if let Some(column) = &self.pivot_column
            && self.aggregations.len() > 1
        {
            return Err(Error::Usage(format!(
                "Cannot specify --pivot-column '{}' and have more than one aggregation; you specified {}: {:?}",
                column,
                self.aggregations.len(),
                self.aggregations
            )));
        }
        Ok(())
    }
}

/// Print the registry of aggregations.
fn list_aggregations(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "List of aggregate functions:")?;
    for kind in AggregationKind::ALL {
        writeln!(out, "- {}", kind.slug())?;
    }
    Ok(())
}

impl UniformReader for Pivot {}

impl Utility for Pivot {
    fn input_path(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    fn execute(&self, ctx: &Context, source: Source, output: &mut Output) -> Result<()> {
        if self.wants_listing() {
            return list_aggregations(output.text());
        }
        self.check_options()?;
        let aggies = self.parse_aggregations()?;

        let input = self.read_input(source)?;
        if input.is_empty() {
            return Ok(());
        }
        let names = input.column_names;

        let row_names: Vec<String> = match &self.pivot_rows {
            Some(spec) => resolve_columns(spec, &names, ctx.column_offset, None)?
                .iter()
                .map(|i| names[i].clone())
                .collect(),
            None => Vec::new(),
        };
        let pivot_name = match &self.pivot_column {
            Some(spec) => {
                let ids = resolve_columns(spec, &names, ctx.column_offset, None)?;
                if ids.len() > 1 {
                    return Err(Error::Usage(format!(
                        "Only one -c/--pivot-column is allowed, not {}: {:?}",
                        ids.len(),
                        ids.as_slice()
                    )));
                }
                ids.iter().next().map(|i| names[i].clone())
            }
            None => None,
        };

        let mut used: Vec<String> = Vec::new();
        let referenced = row_names
            .iter()
            .chain(pivot_name.iter())
            .map(String::as_str)
            .chain(aggies.iter().filter_map(Aggy::column_name));
        for name in referenced {
            if !names.iter().any(|n| n == name) {
                return Err(Error::ColumnName {
                    name: name.to_string(),
                    available: names.clone(),
                });
            }
            if !used.iter().any(|u| u == name) {
                used.push(name.to_string());
            }
        }

        let positions: Vec<usize> = used
            .iter()
            .filter_map(|u| names.iter().position(|n| n == u))
            .collect();
        let rows = input
            .rows
            .map(|row| {
                row.map(|row| {
                    positions
                        .iter()
                        .map(|p| row.get(*p).cloned().unwrap_or_default())
                        .collect()
                })
            })
            .collect::<Result<Vec<Vec<String>>>>()?;
        debug!(rows = rows.len(), columns = ?used, "loaded pivot table");

        let options = self.cast_options();
        let table = Table::from_rows(used, rows, &options);
        let aggregations = aggies
            .iter()
            .map(|aggy| dispatch(aggy, &table, &options))
            .collect::<Result<Vec<_>>>()?;

        let keys: Vec<usize> = row_names
            .iter()
            .filter_map(|name| table.column_index(name))
            .collect();

        let mut sink = output.records();
        match pivot_name.and_then(|name| table.column_index(&name)) {
            Some(pivot) => {
                write_pivot(&table, &keys, pivot, &row_names, &aggregations[0], &mut *sink)?
            }
            None => write_grouped(&table, &keys, &row_names, &aggregations, &mut *sink)?,
        }
        sink.finish()
    }
}

fn write_grouped(
    table: &Table,
    keys: &[usize],
    row_names: &[String],
    aggregations: &[Aggregation],
    sink: &mut dyn RecordSink,
) -> Result<()> {
    let mut header = row_names.to_vec();
    header.extend(aggregations.iter().map(Aggregation::title));
    sink.write_header(&header)?;

    for group in table.group_by(keys, &table.all_rows()) {
        let mut record: Vec<String> = group.key.iter().map(Datum::to_string).collect();
        record.extend(
            aggregations
                .iter()
                .map(|a| a.run(table, &group.rows).to_string()),
        );
        sink.write_record(&record)?;
    }
    Ok(())
}

fn write_pivot(
    table: &Table,
    keys: &[usize],
    pivot: usize,
    row_names: &[String],
    aggregation: &Aggregation,
    sink: &mut dyn RecordSink,
) -> Result<()> {
    let groups = table.group_by(keys, &table.all_rows());
    let walked: Vec<usize> = groups.iter().flat_map(|g| g.rows.iter().copied()).collect();
    let pivot_values = table.distinct(pivot, &walked);

    let mut header = row_names.to_vec();
    header.extend(pivot_values.iter().map(Datum::to_string));
    sink.write_header(&header)?;

    for group in &groups {
        let mut record: Vec<String> = group.key.iter().map(Datum::to_string).collect();
        for value in &pivot_values {
            let cell_rows: Vec<usize> = group
                .rows
                .iter()
                .copied()
                .filter(|r| table.same_group(*r, pivot, value))
                .collect();
            let cell = if cell_rows.is_empty() {
                aggregation.default_value()
            } else {
                aggregation.run(table, &cell_rows)
            };
            record.push(cell.to_string());
        }
        sink.write_record(&record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::testing::run_csv;

    const PEEPS: &str = "name,race,gender,age\n\
        Joe,white,female,20\n\
        Jane,asian,male,20\n\
        Jill,black,female,20\n\
        Julia,black,female,25\n\
        Joan,asian,female,25\n\
        Jim,latino,male,25\n";

    fn pivot(rows: Option<&str>, column: Option<&str>, aggs: &[&str]) -> Pivot {
        Pivot {
            pivot_rows: rows.map(str::to_string),
            pivot_column: column.map(str::to_string),
            aggregations: aggs.iter().map(|a| a.to_string()).collect(),
            ..Pivot::default()
        }
    }

    fn run(p: Pivot) -> Result<String> {
        run_csv(&p, Context::default(), PEEPS)
    }

    #[test]
    fn rows_count_by_default() {
        let out = run(pivot(Some("gender"), None, &[])).unwrap();
        assert_eq!(out, "gender,count_of\nfemale,4\nmale,2\n");
    }

    #[test]
    fn rows_with_several_aggregations() {
        let out = run(pivot(Some("gender"), None, &["count", "sum:age"])).unwrap();
        assert_eq!(out, "gender,count_of,sum_of_age\nfemale,4,90\nmale,2,45\n");
    }

    #[test]
    fn multiple_pivot_rows_nest() {
        let out = run(pivot(Some("race,gender"), None, &[])).unwrap();
        assert_eq!(
            out,
            "race,gender,count_of\n\
             white,female,1\n\
             asian,male,1\n\
             asian,female,1\n\
             black,female,2\n\
             latino,male,1\n"
        );
    }

    #[test]
    fn rows_and_column() {
        let out = run(pivot(Some("race"), Some("gender"), &[])).unwrap();
        assert_eq!(
            out,
            "race,female,male\nwhite,1,0\nasian,1,1\nblack,2,0\nlatino,0,1\n"
        );
    }

    #[test]
    fn column_order_follows_grouped_rows() {
        let out = run(pivot(Some("gender,race"), Some("name"), &[])).unwrap();
        let header = out.lines().next().unwrap();
        assert_eq!(header, "gender,race,Joe,Jill,Julia,Joan,Jane,Jim");
    }

    #[test]
    fn column_only_is_one_row() {
        let out = run(pivot(None, Some("gender"), &["mean:age"])).unwrap();
        assert_eq!(out, "female,male\n22.5,22.5\n");
    }

    #[test]
    fn missing_cells_are_empty_for_other_aggregations() {
        let out = run(pivot(Some("race"), Some("gender"), &["sum:age"])).unwrap();
        assert_eq!(
            out,
            "race,female,male\nwhite,20,\nasian,25,20\nblack,45,\nlatino,,25\n"
        );
    }

    #[test]
    fn count_with_value_and_title() {
        let out = run(pivot(Some("gender"), None, &["count:age,25|Twenty-fives"])).unwrap();
        assert_eq!(out, "gender,Twenty-fives\nfemale,2\nmale,1\n");
    }

    #[test]
    fn unknown_aggregation_column() {
        let err = run(pivot(Some("gender"), None, &["sum:height"])).unwrap_err();
        assert!(matches!(err, Error::ColumnName { ref name, .. } if name == "height"));
    }

    #[test]
    fn uncastable_count_value() {
        let err = run(pivot(Some("gender"), None, &["count:age,Bert"])).unwrap_err();
        assert!(matches!(err, Error::Cast { .. }));
    }

    #[test]
    fn requires_rows_or_column() {
        let err = run(pivot(None, None, &[])).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn only_one_pivot_column() {
        let err = run(pivot(None, Some("race,gender"), &[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only one -c/--pivot-column is allowed, not 2: [1, 2]"
        );
    }

    #[test]
    fn column_mode_allows_one_aggregation() {
        let err = run(pivot(Some("race"), Some("gender"), &["count", "sum:age"])).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn lists_aggregations() {
        let p = Pivot {
            list_aggs: true,
            ..Pivot::default()
        };
        let out = run(p).unwrap();
        assert!(out.starts_with("List of aggregate functions:\n- count\n- max\n"));
        assert!(out.ends_with("- sum\n"));
    }

    #[test]
    fn invalid_aggregation_name() {
        let err = run(pivot(Some("gender"), None, &["just magic!"])).unwrap_err();
        assert!(matches!(err, Error::InvalidAggregateName(_)));
    }
}
