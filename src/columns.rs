//! Resolution of column identifiers (`"1,id,3-5"`) to column positions.

use crate::ast::ColumnToken;
use crate::error::{Error, Result};
use crate::parser::{column_token, split_delimited};

/// Ordered zero-based column positions. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet(Vec<usize>);

impl ColumnSet {
    /// Every column of a table with `len` columns.
    pub fn all(len: usize) -> Self {
        Self((0..len).collect())
    }

    pub fn contains(&self, position: usize) -> bool {
        self.0.contains(&position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }
}

impl From<Vec<usize>> for ColumnSet {
    fn from(positions: Vec<usize>) -> Self {
        Self(positions)
    }
}

/// Resolve a column specification against `column_names`.
///
/// Tokens are column names, integers counted from `offset`, or inclusive
/// ranges `A-B` / `A:B` with either end optional. Purely numeric tokens are
/// always read as positions. An empty specification selects every column.
/// Positions named by `excluded` (same syntax) are removed afterwards.
pub fn resolve_columns(
    spec: &str,
    column_names: &[String],
    offset: usize,
    excluded: Option<&str>,
) -> Result<ColumnSet> {
    if column_names.is_empty() {
        return Ok(ColumnSet::default());
    }

    let mut positions = if spec.trim().is_empty() {
        (0..column_names.len()).collect()
    } else {
        parse_spec(spec, column_names, offset)?
    };

    if let Some(excluded) = excluded.filter(|e| !e.trim().is_empty()) {
        let dropped = parse_spec(excluded, column_names, offset)?;
        positions.retain(|p| !dropped.contains(p));
    }

    Ok(ColumnSet(positions))
}

fn parse_spec(spec: &str, column_names: &[String], offset: usize) -> Result<Vec<usize>> {
    let mut positions = Vec::new();
    for token in split_delimited(spec, ',', 0, None) {
        let is_numeric = !token.is_empty() && token.trim().chars().all(|c| c.is_ascii_digit());
        if !is_numeric && let Some(p) = column_names.iter().position(|name| *name == token) {
            positions.push(p);
            continue;
        }

        match column_token(&token) {
            Some(ColumnToken::Index(n)) => positions.push(position(n, column_names, offset)?),
            Some(ColumnToken::Range { start, end }) => {
                let start = start.unwrap_or(offset);
                let end = match end {
                    Some(end) => end,
                    None => {
                        position(start, column_names, offset)?;
                        column_names.len() - 1 + offset
                    }
                };
                if end < start {
                    return Err(Error::ColumnIdentifier(format!(
                        "Invalid range {}. The end of a range must not come before its start.",
                        token
                    )));
                }
                for n in start..=end {
                    positions.push(position(n, column_names, offset)?);
                }
            }
            None if token.contains(['-', ':']) => {
                return Err(Error::ColumnIdentifier(format!(
                    "Invalid range {}. Ranges must be two integers separated by a - or : character.",
                    token
                )));
            }
            None => {
                let names: Vec<String> = column_names.iter().map(|n| format!("'{}'", n)).collect();
                return Err(Error::ColumnIdentifier(format!(
                    "Column '{}' is invalid. It is neither an integer nor a column name. Column names are: {}",
                    token,
                    names.join(", ")
                )));
            }
        }
    }
    Ok(positions)
}

/// Convert a user-facing column number to a zero-based position.
fn position(n: usize, column_names: &[String], offset: usize) -> Result<usize> {
    if n < offset {
        return Err(Error::ColumnIdentifier(format!(
            "Column {} is invalid. Columns are {}-based.",
            n, offset
        )));
    }
    let p = n - offset;
    if p >= column_names.len() {
        return Err(Error::ColumnIdentifier(format!(
            "Column {} is invalid. The last column is '{}' at index {}.",
            n,
            column_names[column_names.len() - 1],
            column_names.len() - 1 + offset
        )));
    }
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn resolve(spec: &str, offset: usize) -> Result<Vec<usize>> {
        let cols = names(&["id", "name", "age", "city", "3", "zip"]);
        resolve_columns(spec, &cols, offset, None).map(ColumnSet::into_vec)
    }

    #[rstest]
    #[case("", vec![0, 1, 2, 3, 4, 5])]
    #[case("2-4", vec![1, 2, 3])]
    #[case("2:4", vec![1, 2, 3])]
    #[case("name", vec![1])]
    #[case("1,id,3-5", vec![0, 0, 2, 3, 4])]
    #[case("city,1,city", vec![3, 0, 3])]
    #[case("5-", vec![4, 5])]
    #[case("-2", vec![0, 1])]
    #[case("3", vec![2])]
    fn resolves_one_based(#[case] spec: &str, #[case] expected: Vec<usize>) {
        assert_eq!(resolve(spec, 1).unwrap(), expected);
    }

    #[test]
    fn resolves_zero_based() {
        assert_eq!(resolve("0,2-3", 0).unwrap(), vec![0, 2, 3]);
        assert_eq!(resolve("4-", 0).unwrap(), vec![4, 5]);
        assert_eq!(resolve("-1", 0).unwrap(), vec![0, 1]);
    }

    #[test]
    fn every_index_round_trips() {
        let cols = names(&["a", "b", "c", "d"]);
        for offset in [0, 1] {
            for i in 0..cols.len() {
                let spec = (i + offset).to_string();
                let got = resolve_columns(&spec, &cols, offset, None).unwrap();
                assert_eq!(got.into_vec(), vec![i]);
            }
        }
    }

    #[test]
    fn excluded_columns_are_removed() {
        let cols = names(&["a", "b", "c", "d"]);
        let got = resolve_columns("", &cols, 1, Some("b,4")).unwrap();
        assert_eq!(got.into_vec(), vec![0, 2]);
    }

    #[test]
    fn no_columns_resolves_to_nothing() {
        assert!(resolve_columns("1,2", &[], 1, None).unwrap().is_empty());
    }

    #[test]
    fn unknown_name_lists_columns() {
        let err = resolve("height", 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column 'height' is invalid. It is neither an integer nor a column name. Column names are: 'id', 'name', 'age', 'city', '3', 'zip'"
        );
    }

    #[test]
    fn index_past_the_end() {
        let err = resolve("7", 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column 7 is invalid. The last column is 'zip' at index 6."
        );
    }

    #[test]
    fn open_range_starting_past_the_end() {
        let err = resolve("9-", 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column 9 is invalid. The last column is 'zip' at index 6."
        );
    }

    #[test]
    fn index_below_offset() {
        let err = resolve("0", 1).unwrap_err();
        assert_eq!(err.to_string(), "Column 0 is invalid. Columns are 1-based.");
    }

    #[test]
    fn malformed_range() {
        let err = resolve("a-b", 1).unwrap_err();
        assert!(err.to_string().starts_with("Invalid range a-b."));
        assert!(matches!(resolve("4-2", 1), Err(Error::ColumnIdentifier(_))));
    }

    #[test]
    fn hyphenated_name_matches_exactly() {
        let cols = names(&["first-name", "last-name"]);
        let got = resolve_columns("last-name", &cols, 1, None).unwrap();
        assert_eq!(got.into_vec(), vec![1]);
    }
}
