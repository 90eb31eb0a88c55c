//! Error types for the csvmedkit utilities.

use std::io;

use thiserror::Error;

use crate::table::DataType;

/// Errors raised while resolving user input or transforming CSV data.
#[derive(Debug, Error)]
pub enum Error {
    /// A column identifier did not resolve to a column.
    #[error("{0}")]
    ColumnIdentifier(String),

    /// An index token did not have one of the accepted shapes.
    #[error("The index specification '{spec}' has an incorrectly formatted value: '{token}'")]
    IncorrectlyFormatted { spec: String, token: String },

    /// An interval ended before it started.
    #[error("Invalid range specified: {0}")]
    InvalidRange(String),

    /// An aggregation descriptor was malformed.
    #[error("Invalid aggregation descriptor '{text}': {reason}")]
    MalformedAggregation { text: String, reason: String },

    /// The aggregation slug is not in the registry.
    #[error(
        "Invalid aggregation: \"{0}\". Call command with option '--list-aggs' to get a list of available aggregations"
    )]
    InvalidAggregateName(String),

    /// An aggregation was given the wrong number of arguments.
    #[error("{0}")]
    AggregationArgument(String),

    /// An aggregation referenced a column that does not exist.
    #[error("'{name}' is not a valid column name; column names are: {}", quoted_list(.available))]
    ColumnName { name: String, available: Vec<String> },

    /// A count filter value could not be converted to the column type.
    #[error(
        "You attempted to count '{value}' in column '{column}', which has datatype {data_type}. But '{value}' could not be converted to {data_type}."
    )]
    Cast {
        value: String,
        column: String,
        data_type: DataType,
    },

    /// An aggregation was applied to a column of an unsupported type.
    #[error("{aggregation} can only be applied to columns containing {expected} data.")]
    DataType {
        aggregation: String,
        expected: String,
    },

    /// Invalid combination of command-line options.
    #[error("{0}")]
    Usage(String),

    #[error("invalid regular expression '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("field larger than field limit ({0})")]
    FieldLimit(usize),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True when the error is a closed downstream pipe.
    pub fn is_broken_pipe(&self) -> bool {
        match self {
            Error::Io(err) => err.kind() == io::ErrorKind::BrokenPipe,
            Error::Csv(err) => match err.kind() {
                csv::ErrorKind::Io(err) => err.kind() == io::ErrorKind::BrokenPipe,
                _ => false,
            },
            _ => false,
        }
    }
}

fn quoted_list(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|name| format!("'{}'", name)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Result type for csvmedkit operations.
pub type Result<T> = std::result::Result<T, Error>;
