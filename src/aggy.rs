//! Aggregation descriptors: `slug[:arg1,arg2][|output name]`.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::parser::aggy_parts;
use crate::text::slugify;

/// The fixed registry of aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    Count,
    Max,
    MaxLength,
    Min,
    Mean,
    Median,
    Mode,
    StDev,
    Sum,
}

impl AggregationKind {
    /// Every aggregation, in listing order.
    pub const ALL: [AggregationKind; 9] = [
        AggregationKind::Count,
        AggregationKind::Max,
        AggregationKind::MaxLength,
        AggregationKind::Min,
        AggregationKind::Mean,
        AggregationKind::Median,
        AggregationKind::Mode,
        AggregationKind::StDev,
        AggregationKind::Sum,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::Max => "max",
            AggregationKind::MaxLength => "maxlength",
            AggregationKind::Min => "min",
            AggregationKind::Mean => "mean",
            AggregationKind::Median => "median",
            AggregationKind::Mode => "mode",
            AggregationKind::StDev => "stdev",
            AggregationKind::Sum => "sum",
        }
    }

    /// Display name used in messages, e.g. `MaxLength`.
    pub fn name(self) -> &'static str {
        match self {
            AggregationKind::Count => "Count",
            AggregationKind::Max => "Max",
            AggregationKind::MaxLength => "MaxLength",
            AggregationKind::Min => "Min",
            AggregationKind::Mean => "Mean",
            AggregationKind::Median => "Median",
            AggregationKind::Mode => "Mode",
            AggregationKind::StDev => "StDev",
            AggregationKind::Sum => "Sum",
        }
    }

    /// Look up a slug, ignoring case.
    pub fn lookup(slug: &str) -> Result<Self> {
        let lower = slug.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == lower)
            .ok_or_else(|| Error::InvalidAggregateName(slug.to_string()))
    }

    /// How many positional arguments the aggregation accepts.
    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            AggregationKind::Count => 0..=2,
            _ => 1..=1,
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for AggregationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AggregationKind::lookup(s)
    }
}

/// A parsed aggregation descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggy {
    kind: AggregationKind,
    args: Vec<String>,
    output_name: Option<String>,
}

impl Aggy {
    /// Parse `slug[:arg1,arg2][|output name]`.
    pub fn parse(text: &str) -> Result<Self> {
        let parts = aggy_parts(text)?;
        let kind = AggregationKind::lookup(&parts.slug)?;
        Ok(Self {
            kind,
            args: parts.args,
            output_name: parts.output_name,
        })
    }

    pub fn new(kind: AggregationKind, args: Vec<String>, output_name: Option<String>) -> Self {
        Self {
            kind,
            args,
            output_name: output_name.filter(|name| !name.is_empty()),
        }
    }

    pub fn kind(&self) -> AggregationKind {
        self.kind
    }

    /// The lowercased slug.
    pub fn slug(&self) -> &'static str {
        self.kind.slug()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The column named by the first argument, if any.
    pub fn column_name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn output_name(&self) -> Option<&str> {
        self.output_name.as_deref()
    }

    /// The explicit output name, or `slug of args...` slugified.
    ///
    /// A bare `count` is titled `count_of`.
    pub fn title(&self) -> String {
        match &self.output_name {
            Some(name) => name.clone(),
            None => {
                let mut words = vec![self.slug().to_string(), "of".to_string()];
                words.extend(self.args.iter().cloned());
                slugify(&words.join(" "))
            }
        }
    }

    /// A copy with argument `index` replaced by `value`.
    pub fn with_arg(&self, index: usize, value: String) -> Self {
        let mut args = self.args.clone();
        if index < args.len() {
            args[index] = value;
        } else {
            args.resize(index, String::new());
            args.push(value);
        }
        Self {
            kind: self.kind,
            args,
            output_name: self.output_name.clone(),
        }
    }
}

impl FromStr for Aggy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Aggy::parse(s)
    }
}
