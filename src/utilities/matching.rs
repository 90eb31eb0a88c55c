//! Pattern expressions shared by `sed` and `rgrep`.

use std::borrow::Cow;
use std::path::Path;

use regex::Regex;

use crate::columns::{ColumnSet, resolve_columns};
use crate::error::{Error, Result};

/// A regular expression or a literal substring.
#[derive(Debug, Clone)]
pub enum Matcher {
    Regex(Regex),
    Literal(String),
}

impl Matcher {
    pub fn new(pattern: &str, literal: bool) -> Result<Self> {
        if literal {
            return Ok(Matcher::Literal(pattern.to_string()));
        }
        Regex::new(pattern)
            .map(Matcher::Regex)
            .map_err(|source| Error::Regex {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Regex(re) => re.is_match(text),
            Matcher::Literal(needle) => text.contains(needle.as_str()),
        }
    }

    /// Replace every match. Regex replacements must already be in the
    /// `${1}` form.
    pub fn replace_all<'t>(&self, text: &'t str, replacement: &str) -> Cow<'t, str> {
        match self {
            Matcher::Regex(re) => re.replace_all(text, replacement),
            Matcher::Literal(needle) if !needle.is_empty() && text.contains(needle.as_str()) => {
                Cow::Owned(text.replace(needle.as_str(), replacement))
            }
            Matcher::Literal(_) => Cow::Borrowed(text),
        }
    }
}

/// A matcher bound to the columns it tests.
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    pub matcher: Matcher,
    pub columns: ColumnSet,
}

impl ColumnFilter {
    pub fn new(
        pattern: &str,
        literal: bool,
        columns: &str,
        column_names: &[String],
        offset: usize,
    ) -> Result<Self> {
        Ok(Self {
            matcher: Matcher::new(pattern, literal)?,
            columns: resolve_columns(columns, column_names, offset, None)?,
        })
    }

    /// Test the selected cells of `row`. Missing cells read as empty.
    ///
    /// With `any_match` the first matching cell decides, otherwise the first
    /// cell that fails does. `inverse` flips the outcome.
    pub fn test(&self, row: &[String], any_match: bool, inverse: bool) -> bool {
        for i in self.columns.iter() {
            let value = row.get(i).map_or("", String::as_str);
            let hit = self.matcher.is_match(value);
            if any_match && hit {
                return !inverse;
            }
            if !any_match && !hit {
                return inverse;
            }
        }
        if any_match { inverse } else { !inverse }
    }
}

/// An `-E` option can swallow the input file as its last value. Returns that
/// value when it names an existing file or `-`.
pub fn trailing_input(expressions: &[Vec<String>], arity: usize) -> Option<&str> {
    let last = expressions.last()?;
    if last.len() != arity {
        return None;
    }
    let candidate = last.last()?;
    (candidate == "-" || Path::new(candidate).is_file()).then_some(candidate.as_str())
}

/// Name for the column prepended by `-l/--linenumbers`.
pub const LINE_NUMBER_COLUMN: &str = "line_number";

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn names() -> Vec<String> {
        row(&["name", "city", "note"])
    }

    #[test]
    fn literal_does_not_interpret_metacharacters() {
        let m = Matcher::new("a.c", true).unwrap();
        assert!(m.is_match("xa.cx"));
        assert!(!m.is_match("abc"));
        assert_eq!(m.replace_all("a.c a.c", "!"), "! !");
    }

    #[test]
    fn bad_regex_is_reported() {
        let err = Matcher::new("(", false).unwrap_err();
        assert!(matches!(err, Error::Regex { .. }));
    }

    #[rstest]
    #[case(true, false, true)]
    #[case(true, true, false)]
    #[case(false, false, false)]
    #[case(false, true, true)]
    fn filter_modes(#[case] any_match: bool, #[case] inverse: bool, #[case] expected: bool) {
        let filter = ColumnFilter::new("^J", false, "name,city", &names(), 1).unwrap();
        let r = row(&["Joe", "Boston", ""]);
        assert_eq!(filter.test(&r, any_match, inverse), expected);
    }

    #[test]
    fn all_match_needs_every_column() {
        let filter = ColumnFilter::new("o", false, "1-2", &names(), 1).unwrap();
        assert!(filter.test(&row(&["Joe", "Boston"]), false, false));
        assert!(!filter.test(&row(&["Ann", "Boston"]), false, false));
    }

    #[test]
    fn short_rows_read_as_empty() {
        let filter = ColumnFilter::new("^$", false, "note", &names(), 1).unwrap();
        assert!(filter.test(&row(&["Joe"]), true, false));
    }

    #[test]
    fn trailing_input_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let exprs = vec![vec!["a".to_string(), "b".to_string(), path.clone()]];
        assert_eq!(trailing_input(&exprs, 3), Some(path.as_str()));
        assert_eq!(trailing_input(&exprs, 2), None);

        let exprs = vec![row(&["a", "b", "name"])];
        assert_eq!(trailing_input(&exprs, 3), None);
    }
}
