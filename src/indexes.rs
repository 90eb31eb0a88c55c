//! Row index specifications such as `"0-2,6-8,7-"`.

use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::ast::IndexToken;
use crate::error::{Error, Result};
use crate::parser::{index_token, split_delimited};

/// A set of row indexes: single indexes, closed intervals and an optional
/// open lower bound.
///
/// Repeated and overlapping tokens are accepted; membership is a set test so
/// each index matches at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet {
    indexes: Vec<usize>,
    intervals: Vec<RangeInclusive<usize>>,
    lower_bound: Option<usize>,
}

impl IndexSet {
    /// Parse a comma-separated index specification.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut set = IndexSet::default();
        for token in split_delimited(spec, ',', 0, None) {
            match index_token(&token) {
                Some(IndexToken::Single(i)) => set.indexes.push(i),
                Some(IndexToken::From(start)) => {
                    set.lower_bound = Some(set.lower_bound.map_or(start, |b| b.min(start)));
                }
                Some(IndexToken::Closed(start, end)) => {
                    if end < start {
                        let compact: String =
                            token.chars().filter(|c| !c.is_whitespace()).collect();
                        return Err(Error::InvalidRange(compact));
                    }
                    set.intervals.push(start..=end);
                }
                None => {
                    return Err(Error::IncorrectlyFormatted {
                        spec: spec.to_string(),
                        token,
                    });
                }
            }
        }
        set.indexes.sort_unstable();
        set.indexes.dedup();
        Ok(set)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lower_bound.is_some_and(|bound| index >= bound)
            || self.indexes.binary_search(&index).is_ok()
            || self.intervals.iter().any(|range| range.contains(&index))
    }

    /// The smallest index of the open-ended part, if any.
    pub fn lower_bound(&self) -> Option<usize> {
        self.lower_bound
    }

    pub fn indexes(&self) -> &[usize] {
        &self.indexes
    }

    pub fn intervals(&self) -> &[RangeInclusive<usize>] {
        &self.intervals
    }

    /// The last index that can match, or `None` when the set is unbounded.
    pub fn max_index(&self) -> Option<usize> {
        if self.lower_bound.is_some() {
            return None;
        }
        let interval_max = self.intervals.iter().map(|r| *r.end()).max();
        let index_max = self.indexes.last().copied();
        Some(interval_max.max(index_max).unwrap_or(0))
    }

    pub fn is_empty(&self) -> bool {
        self.lower_bound.is_none() && self.indexes.is_empty() && self.intervals.is_empty()
    }
}

impl FromStr for IndexSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        IndexSet::parse(s)
    }
}

/// Parse an index specification. Alias of [`IndexSet::parse`].
pub fn resolve_indices(spec: &str) -> Result<IndexSet> {
    IndexSet::parse(spec)
}
