//! An in-memory table with per-column type inference.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::ser::{Serialize, Serializer};

const NULL_VALUES: [&str; 6] = ["", "na", "n/a", "none", "null", "."];
const TRUE_VALUES: [&str; 4] = ["true", "t", "yes", "y"];
const FALSE_VALUES: [&str; 4] = ["false", "f", "no", "n"];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%b. %d, %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M %p",
];

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?\$?(?:\d{1,3}(?:,\d{3})+|\d+)?(?:\.\d+)?(?:[eE][-+]?\d+)?$")
        .expect("static regex")
});

/// The inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Boolean,
    Number,
    Date,
    DateTime,
    Text,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "Boolean",
            DataType::Number => "Number",
            DataType::Date => "Date",
            DataType::DateTime => "DateTime",
            DataType::Text => "Text",
        };
        write!(f, "{}", name)
    }
}

/// How text is converted to typed values.
#[derive(Debug, Clone, Default)]
pub struct CastOptions {
    /// A chrono format replacing the built-in date formats.
    pub date_format: Option<String>,
    /// A chrono format replacing the built-in datetime formats.
    pub datetime_format: Option<String>,
    /// Treat every column as text.
    pub no_inference: bool,
}

impl DataType {
    /// Cast `text` to this type. `None` means the text is not a valid value;
    /// null tokens cast to [`Datum::Null`] for every type.
    pub fn cast(self, text: &str, options: &CastOptions) -> Option<Datum> {
        let trimmed = text.trim();
        if is_null(trimmed) {
            return Some(Datum::Null);
        }
        match self {
            DataType::Text => Some(Datum::Text(text.to_string())),
            DataType::Boolean => {
                let lower = trimmed.to_lowercase();
                if TRUE_VALUES.contains(&lower.as_str()) {
                    Some(Datum::Boolean(true))
                } else if FALSE_VALUES.contains(&lower.as_str()) {
                    Some(Datum::Boolean(false))
                } else {
                    None
                }
            }
            DataType::Number => parse_number(trimmed).map(Datum::Number),
            DataType::Date => match &options.date_format {
                Some(format) => NaiveDate::parse_from_str(trimmed, format).ok(),
                None => DATE_FORMATS
                    .iter()
                    .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok()),
            }
            .map(Datum::Date),
            DataType::DateTime => match &options.datetime_format {
                Some(format) => NaiveDateTime::parse_from_str(trimmed, format).ok(),
                None => DATETIME_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok()),
            }
            .map(Datum::DateTime),
        }
    }

    /// Pick the first type that every value casts to.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a str>, options: &CastOptions) -> Self {
        if options.no_inference {
            return DataType::Text;
        }
        let mut candidates = vec![
            DataType::Boolean,
            DataType::Number,
            DataType::Date,
            DataType::DateTime,
        ];
        let mut seen_value = false;
        for value in values {
            if is_null(value.trim()) {
                continue;
            }
            seen_value = true;
            candidates.retain(|t| t.cast(value, options).is_some());
            if candidates.is_empty() {
                return DataType::Text;
            }
        }
        if !seen_value {
            return DataType::Text;
        }
        candidates.first().copied().unwrap_or(DataType::Text)
    }
}

fn is_null(trimmed: &str) -> bool {
    let lower = trimmed.to_lowercase();
    NULL_VALUES.contains(&lower.as_str())
}

fn parse_number(text: &str) -> Option<Decimal> {
    if !NUMBER.is_match(text) || !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '$').collect();
    if cleaned.contains(['e', 'E']) {
        Decimal::from_scientific(&cleaned).ok()
    } else {
        Decimal::from_str(&cleaned).ok()
    }
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Boolean(bool),
    Number(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Datum::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Key used to group equal values.
    fn group_key(&self) -> String {
        match self {
            Datum::Null => "\u{0}null".to_string(),
            other => format!("{}\u{0}{}", other.kind_tag(), other),
        }
    }

    fn kind_tag(&self) -> u8 {
        match self {
            Datum::Null => 0,
            Datum::Boolean(_) => 1,
            Datum::Number(_) => 2,
            Datum::Date(_) => 3,
            Datum::DateTime(_) => 4,
            Datum::Text(_) => 5,
        }
    }
}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Datum::Boolean(a), Datum::Boolean(b)) => a.partial_cmp(b),
            (Datum::Number(a), Datum::Number(b)) => a.partial_cmp(b),
            (Datum::Date(a), Datum::Date(b)) => a.partial_cmp(b),
            (Datum::DateTime(a), Datum::DateTime(b)) => a.partial_cmp(b),
            (Datum::Text(a), Datum::Text(b)) => a.partial_cmp(b),
            (Datum::Null, Datum::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => Ok(()),
            Datum::Boolean(b) => write!(f, "{}", b),
            Datum::Number(n) => write!(f, "{}", n.normalize()),
            Datum::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Datum::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Datum::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for Datum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Datum::Null => serializer.serialize_none(),
            Datum::Boolean(b) => serializer.serialize_bool(*b),
            Datum::Number(n) => {
                let n = n.normalize();
                if n.scale() == 0
                    && let Some(i) = n.to_i64()
                {
                    serializer.serialize_i64(i)
                } else if let Some(f) = n.to_f64() {
                    serializer.serialize_f64(f)
                } else {
                    serializer.serialize_str(&n.to_string())
                }
            }
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

/// Rows of typed values with named, typed columns.
#[derive(Debug, Clone)]
pub struct Table {
    column_names: Vec<String>,
    column_types: Vec<DataType>,
    rows: Vec<Vec<Datum>>,
}

impl Table {
    /// Build a table from raw text rows, inferring a type per column.
    ///
    /// Short rows are padded with nulls; extra cells are ignored.
    pub fn from_rows(
        column_names: Vec<String>,
        rows: Vec<Vec<String>>,
        options: &CastOptions,
    ) -> Self {
        let width = column_names.len();
        let column_types: Vec<DataType> = (0..width)
            .map(|c| {
                DataType::infer(
                    rows.iter().map(|row| row.get(c).map_or("", String::as_str)),
                    options,
                )
            })
            .collect();

        let rows = rows
            .iter()
            .map(|row| {
                column_types
                    .iter()
                    .enumerate()
                    .map(|(c, data_type)| {
                        let text = row.get(c).map_or("", String::as_str);
                        data_type.cast(text, options).unwrap_or(Datum::Null)
                    })
                    .collect()
            })
            .collect();

        Self {
            column_names,
            column_types,
            rows,
        }
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|n| n == name)
    }

    pub fn column_type(&self, index: usize) -> DataType {
        self.column_types[index]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, row: usize, column: usize) -> &Datum {
        &self.rows[row][column]
    }

    /// Values of `column` for the given row numbers.
    pub fn values<'a>(
        &'a self,
        column: usize,
        rows: &'a [usize],
    ) -> impl Iterator<Item = &'a Datum> + 'a {
        rows.iter().map(move |r| &self.rows[*r][column])
    }

    /// All row numbers, in order.
    pub fn all_rows(&self) -> Vec<usize> {
        (0..self.rows.len()).collect()
    }

    /// Group `rows` by the values of `keys`.
    ///
    /// Grouping is nested: groups for the first key appear in order of first
    /// appearance, and within each of them the groups for the next key do
    /// the same.
    pub fn group_by(&self, keys: &[usize], rows: &[usize]) -> Vec<Group> {
        let mut groups = vec![Group {
            key: Vec::new(),
            rows: rows.to_vec(),
        }];
        for &column in keys {
            groups = groups
                .into_iter()
                .flat_map(|group| self.split_group(group, column))
                .collect();
        }
        groups
    }

    fn split_group(&self, group: Group, column: usize) -> Vec<Group> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut split: Vec<Group> = Vec::new();
        for row in group.rows {
            let value = &self.rows[row][column];
            let slot = *positions.entry(value.group_key()).or_insert_with(|| {
                let mut key = group.key.clone();
                key.push(value.clone());
                split.push(Group {
                    key,
                    rows: Vec::new(),
                });
                split.len() - 1
            });
            split[slot].rows.push(row);
        }
        split
    }

    /// Distinct values of `column` over `rows`, in order of first appearance.
    pub fn distinct(&self, column: usize, rows: &[usize]) -> Vec<Datum> {
        let mut seen = std::collections::HashSet::new();
        rows.iter()
            .map(|r| &self.rows[*r][column])
            .filter(|v| seen.insert(v.group_key()))
            .cloned()
            .collect()
    }

    /// Whether `value` groups together with the cell at (`row`, `column`).
    pub fn same_group(&self, row: usize, column: usize, value: &Datum) -> bool {
        self.rows[row][column].group_key() == value.group_key()
    }
}

/// Rows sharing the same key values.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Vec<Datum>,
    pub rows: Vec<usize>,
}
