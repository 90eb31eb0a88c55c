//! Binding aggregation descriptors to a table and computing them.

use std::collections::HashMap;

use rust_decimal::{Decimal, MathematicalOps};
use tracing::debug;

use crate::aggy::{AggregationKind, Aggy};
use crate::error::{Error, Result};
use crate::table::{CastOptions, DataType, Datum, Table};

/// An aggregation validated against a table and ready to run.
#[derive(Debug, Clone)]
pub struct Aggregation {
    aggy: Aggy,
    column: Option<usize>,
    filter: Option<Datum>,
}

/// Validate `aggy` against `table` and bind it.
///
/// The first argument must name a column. For `count` with a second
/// argument, that value is cast to the column's type; the returned
/// aggregation carries a new descriptor with the canonical form of the cast
/// value, which its title reflects.
pub fn dispatch(aggy: &Aggy, table: &Table, options: &CastOptions) -> Result<Aggregation> {
    let kind = aggy.kind();
    let arity = kind.arity();
    if !arity.contains(&aggy.args().len()) {
        return Err(Error::AggregationArgument(arity_message(kind, aggy.args().len())));
    }

    let column = match aggy.column_name() {
        Some(name) => Some(table.column_index(name).ok_or_else(|| Error::ColumnName {
            name: name.to_string(),
            available: table.column_names().to_vec(),
        })?),
        None => None,
    };

    let mut bound = aggy.clone();
    let mut filter = None;
    if let (Some(column), Some(raw)) = (column, aggy.args().get(1)) {
        let data_type = table.column_type(column);
        let value = data_type.cast(raw, options).ok_or_else(|| Error::Cast {
            value: raw.clone(),
            column: table.column_names()[column].clone(),
            data_type,
        })?;
        bound = aggy.with_arg(1, value.to_string());
        filter = Some(value);
    }

    if let Some(column) = column {
        check_type(kind, table.column_type(column))?;
    }

    debug!(aggregation = %bound.title(), kind = %kind, "bound aggregation");
    Ok(Aggregation {
        aggy: bound,
        column,
        filter,
    })
}

fn arity_message(kind: AggregationKind, given: usize) -> String {
    match kind {
        AggregationKind::Count => format!(
            "count takes at most 2 arguments (a column name and a value), but {} were given",
            given
        ),
        other => format!(
            "{} takes exactly 1 argument (a column name), but {} were given",
            other.slug(),
            given
        ),
    }
}

fn check_type(kind: AggregationKind, data_type: DataType) -> Result<()> {
    let expected = match kind {
        AggregationKind::Count => return Ok(()),
        AggregationKind::Sum
        | AggregationKind::Mean
        | AggregationKind::Median
        | AggregationKind::Mode
        | AggregationKind::StDev => &[DataType::Number][..],
        AggregationKind::Min | AggregationKind::Max => {
            &[DataType::Number, DataType::Date, DataType::DateTime][..]
        }
        AggregationKind::MaxLength => &[DataType::Text][..],
    };
    if expected.contains(&data_type) {
        return Ok(());
    }
    let names: Vec<String> = expected.iter().map(ToString::to_string).collect();
    Err(Error::DataType {
        aggregation: kind.name().to_string(),
        expected: names.join(", "),
    })
}

impl Aggregation {
    /// The descriptor after coercion.
    pub fn aggy(&self) -> &Aggy {
        &self.aggy
    }

    pub fn kind(&self) -> AggregationKind {
        self.aggy.kind()
    }

    pub fn title(&self) -> String {
        self.aggy.title()
    }

    /// The value used for a combination with no rows in a pivot.
    pub fn default_value(&self) -> Datum {
        match self.kind() {
            AggregationKind::Count => Datum::Number(Decimal::ZERO),
            _ => Datum::Null,
        }
    }

    /// Compute the aggregation over `rows` of `table`.
    pub fn run(&self, table: &Table, rows: &[usize]) -> Datum {
        let Some(column) = self.column else {
            return Datum::Number(Decimal::from(rows.len()));
        };
        let values = table.values(column, rows);

        match self.kind() {
            AggregationKind::Count => {
                let count = match &self.filter {
                    Some(filter) => values.filter(|v| *v == filter).count(),
                    None => values.filter(|v| !v.is_null()).count(),
                };
                Datum::Number(Decimal::from(count))
            }
            AggregationKind::Sum => total(&numbers(values)).map_or(Datum::Null, Datum::Number),
            AggregationKind::Mean => mean(&numbers(values)).map_or(Datum::Null, Datum::Number),
            AggregationKind::Median => median(numbers(values)),
            AggregationKind::Mode => mode(numbers(values)),
            AggregationKind::StDev => stdev(&numbers(values)),
            AggregationKind::Min => extreme(values, |a, b| b < a),
            AggregationKind::Max => extreme(values, |a, b| b > a),
            AggregationKind::MaxLength => {
                let longest = values
                    .filter_map(|v| match v {
                        Datum::Text(s) => Some(s.chars().count()),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(0);
                Datum::Number(Decimal::from(longest))
            }
        }
    }
}

fn numbers<'a>(values: impl Iterator<Item = &'a Datum>) -> Vec<Decimal> {
    values.filter_map(Datum::as_number).collect()
}

/// Exact sum, or `None` when it overflows the decimal range.
fn total(numbers: &[Decimal]) -> Option<Decimal> {
    numbers
        .iter()
        .try_fold(Decimal::ZERO, |sum, n| sum.checked_add(*n))
}

fn mean(numbers: &[Decimal]) -> Option<Decimal> {
    if numbers.is_empty() {
        return None;
    }
    total(numbers)?.checked_div(Decimal::from(numbers.len()))
}

fn median(mut numbers: Vec<Decimal>) -> Datum {
    if numbers.is_empty() {
        return Datum::Null;
    }
    numbers.sort();
    let mid = numbers.len() / 2;
    if numbers.len() % 2 == 1 {
        Datum::Number(numbers[mid])
    } else {
        mean(&numbers[mid - 1..=mid]).map_or(Datum::Null, Datum::Number)
    }
}

/// Most frequent value; ties go to the value seen first.
fn mode(numbers: Vec<Decimal>) -> Datum {
    let mut counts: HashMap<Decimal, usize> = HashMap::new();
    for n in &numbers {
        *counts.entry(*n).or_default() += 1;
    }
    let mut best: Option<(Decimal, usize)> = None;
    for n in numbers {
        let count = counts[&n];
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((n, count));
        }
    }
    best.map_or(Datum::Null, |(n, _)| Datum::Number(n))
}

/// Sample standard deviation.
fn stdev(numbers: &[Decimal]) -> Datum {
    if numbers.len() < 2 {
        return Datum::Null;
    }
    let variance = mean(numbers).and_then(|mean| {
        numbers
            .iter()
            .try_fold(Decimal::ZERO, |sum, x| {
                let diff = x.checked_sub(mean)?;
                sum.checked_add(diff.checked_mul(diff)?)
            })?
            .checked_div(Decimal::from(numbers.len() - 1))
    });
    variance
        .and_then(|v| v.sqrt())
        .map_or(Datum::Null, Datum::Number)
}

fn extreme<'a>(
    values: impl Iterator<Item = &'a Datum>,
    replaces: impl Fn(&Datum, &Datum) -> bool,
) -> Datum {
    values
        .filter(|v| !v.is_null())
        .fold(None::<&Datum>, |best, v| match best {
            Some(b) if !replaces(b, v) => Some(b),
            _ => Some(v),
        })
        .cloned()
        .unwrap_or(Datum::Null)
}
