//! Token types produced by the column, index and aggregation grammars.

/// A single comma-separated token of a column specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnToken {
    /// `3`
    Index(usize),
    /// `2-5`, `2:5`, `4-`, `-3`. Missing ends default to the first or last column.
    Range {
        start: Option<usize>,
        end: Option<usize>,
    },
}

/// A single comma-separated token of an index specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexToken {
    /// `7`
    Single(usize),
    /// `7-`
    From(usize),
    /// `3-9`
    Closed(usize, usize),
}

/// The three raw parts of an aggregation descriptor: `slug[:args][|title]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggyParts {
    pub slug: String,
    pub args: Vec<String>,
    pub output_name: Option<String>,
}
