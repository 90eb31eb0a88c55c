use winnow::ModalResult;
use winnow::ascii::{digit1, space0};
use winnow::combinator::{alt, delimited, opt, separated};
use winnow::prelude::*;
use winnow::token::{one_of, take_till};

use crate::ast::{AggyParts, ColumnToken, IndexToken};
use crate::error::{Error, Result};

/// Split `text` on `delimiter`, honouring double-quoted fields.
///
/// A field that opens with `"` runs to the matching close quote, with `""`
/// standing for a literal quote; anything after the close quote is kept as
/// is. Quotes in the middle of an unquoted field are literal. When `escape`
/// is given, the character following it is taken literally. The result is
/// right-padded with empty strings up to `min_length` elements; empty text
/// splits to no elements.
pub fn split_delimited(
    text: &str,
    delimiter: char,
    min_length: usize,
    escape: Option<char>,
) -> Vec<String> {
    let mut fields = if text.is_empty() {
        Vec::new()
    } else {
        let mut input = text;
        let parsed: ModalResult<Vec<String>> = separated(
            1..,
            |input: &mut &str| field(input, delimiter, escape),
            delimiter,
        )
        .parse_next(&mut input);
        // Every character is consumed by some field, so this cannot fail.
        parsed.unwrap_or_else(|_| vec![text.to_string()])
    };
    if fields.len() < min_length {
        fields.resize(min_length, String::new());
    }
    fields
}

/// One field of a delimited string.
fn field(input: &mut &str, delimiter: char, escape: Option<char>) -> ModalResult<String> {
    let mut result = String::new();
    if input.starts_with('"') {
        '"'.parse_next(input)?;
        loop {
            let chunk: &str =
                take_till(0.., |c: char| c == '"' || Some(c) == escape).parse_next(input)?;
            result.push_str(chunk);
            if input.starts_with('"') {
                '"'.parse_next(input)?;
                if input.starts_with('"') {
                    '"'.parse_next(input)?;
                    result.push('"');
                } else {
                    break;
                }
            } else if input.is_empty() {
                // Unterminated quote runs to the end of the text
                break;
            } else {
                escaped_char(input, &mut result)?;
            }
        }
    }
    loop {
        let chunk: &str =
            take_till(0.., |c: char| c == delimiter || Some(c) == escape).parse_next(input)?;
        result.push_str(chunk);
        if input.is_empty() || input.starts_with(delimiter) {
            return Ok(result);
        }
        escaped_char(input, &mut result)?;
    }
}

/// Consume an escape character and push the character it protects.
fn escaped_char(input: &mut &str, result: &mut String) -> ModalResult<()> {
    next_char(input)?;
    if let Some(c) = next_char(input)? {
        result.push(c);
    }
    Ok(())
}

fn next_char(input: &mut &str) -> ModalResult<Option<char>> {
    opt(winnow::token::any).parse_next(input)
}

/// Parse a column-specification token that is not a column name.
///
/// Returns `None` when the token is neither an integer nor a range.
pub fn column_token(token: &str) -> Option<ColumnToken> {
    delimited(space0, alt((column_range, index.map(ColumnToken::Index))), space0)
        .parse(token)
        .ok()
}

fn column_range(input: &mut &str) -> ModalResult<ColumnToken> {
    let start = opt(index).parse_next(input)?;
    delimited(space0, one_of(['-', ':']), space0).parse_next(input)?;
    let end = opt(index).parse_next(input)?;
    Ok(ColumnToken::Range { start, end })
}

/// Parse an index-specification token: `N`, `N-` or `A-B`.
///
/// All whitespace inside the token is ignored.
pub fn index_token(token: &str) -> Option<IndexToken> {
    let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    (index, opt(('-', opt(index))))
        .map(|(start, tail)| match tail {
            None => IndexToken::Single(start),
            Some((_, None)) => IndexToken::From(start),
            Some((_, Some(end))) => IndexToken::Closed(start, end),
        })
        .parse(compact.as_str())
        .ok()
}

/// An unsigned decimal integer.
fn index(input: &mut &str) -> ModalResult<usize> {
    digit1.try_map(str::parse::<usize>).parse_next(input)
}

/// Split an aggregation descriptor `slug[:arg1,arg2][|title]` into its parts.
///
/// Quoting follows [`split_delimited`], so `"a,b"` is a single argument and
/// a quoted `|` or `:` does not start a new part.
pub fn aggy_parts(text: &str) -> Result<AggyParts> {
    let malformed = |reason: &str| Error::MalformedAggregation {
        text: text.to_string(),
        reason: reason.to_string(),
    };

    let mut outer = split_delimited(text, '|', 2, None);
    if outer.len() > 2 {
        return Err(malformed("expected at most one '|' before the output name"));
    }
    let output_name = outer.pop().filter(|name| !name.is_empty());
    let body = outer.pop().unwrap_or_default();

    let mut inner = split_delimited(&body, ':', 2, None);
    if inner.len() > 2 {
        return Err(malformed("expected at most one ':' after the aggregation name"));
    }
    let args_text = inner.pop().unwrap_or_default();
    let slug = inner.pop().unwrap_or_default();
    let args = split_delimited(&args_text, ',', 0, None);

    Ok(AggyParts {
        slug,
        args,
        output_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<String> {
        split_delimited(text, ',', 0, None)
    }

    #[test]
    fn split_plain() {
        assert_eq!(split("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn split_quoted_delimiter() {
        assert_eq!(split("a,\"b,c\""), vec!["a", "b,c"]);
    }

    #[test]
    fn split_doubled_quote() {
        assert_eq!(split("\"say \"\"hi\"\"\",x"), vec!["say \"hi\"", "x"]);
    }

    #[test]
    fn split_mid_field_quote_is_literal() {
        assert_eq!(split("ab\"c,d"), vec!["ab\"c", "d"]);
    }

    #[test]
    fn split_text_after_closing_quote() {
        assert_eq!(split("\"ab\"cd,e"), vec!["abcd", "e"]);
    }

    #[test]
    fn split_unterminated_quote() {
        assert_eq!(split("\"abc,d"), vec!["abc,d"]);
    }

    #[test]
    fn split_empty_fields() {
        assert_eq!(split(",a,"), vec!["", "a", ""]);
    }

    #[test]
    fn split_pads_to_min_length() {
        assert_eq!(
            split_delimited("hello,world", ',', 3, None),
            vec!["hello", "world", ""]
        );
        assert_eq!(split_delimited("", ',', 3, None), vec!["", "", ""]);
        assert!(split_delimited("", ',', 0, None).is_empty());
    }

    #[test]
    fn split_with_escape() {
        assert_eq!(split_delimited("a\\,b,c", ',', 0, Some('\\')), vec!["a,b", "c"]);
        assert_eq!(
            split_delimited("\"a\\\"b\",c", ',', 0, Some('\\')),
            vec!["a\"b", "c"]
        );
    }

    #[test]
    fn split_other_delimiter() {
        assert_eq!(split_delimited("a|\"b|c\"", '|', 0, None), vec!["a", "b|c"]);
    }

    #[test]
    fn column_tokens() {
        assert_eq!(column_token("3"), Some(ColumnToken::Index(3)));
        assert_eq!(column_token(" 3 "), Some(ColumnToken::Index(3)));
        assert_eq!(
            column_token("2-4"),
            Some(ColumnToken::Range {
                start: Some(2),
                end: Some(4)
            })
        );
        assert_eq!(
            column_token("2:4"),
            Some(ColumnToken::Range {
                start: Some(2),
                end: Some(4)
            })
        );
        assert_eq!(
            column_token("5-"),
            Some(ColumnToken::Range {
                start: Some(5),
                end: None
            })
        );
        assert_eq!(
            column_token("-2"),
            Some(ColumnToken::Range {
                start: None,
                end: Some(2)
            })
        );
        assert_eq!(column_token("name"), None);
        assert_eq!(column_token("a-b"), None);
        assert_eq!(column_token("1-2-3"), None);
    }

    #[test]
    fn index_tokens() {
        assert_eq!(index_token("7"), Some(IndexToken::Single(7)));
        assert_eq!(index_token(" 7 - "), Some(IndexToken::From(7)));
        assert_eq!(index_token("3-9"), Some(IndexToken::Closed(3, 9)));
        assert_eq!(index_token("6-3"), Some(IndexToken::Closed(6, 3)));
        assert_eq!(index_token("-3"), None);
        assert_eq!(index_token("a"), None);
        assert_eq!(index_token("1:3"), None);
        assert_eq!(index_token(""), None);
    }

    #[test]
    fn aggy_parts_full() {
        let parts = aggy_parts("count:age,25|Twenty fives").unwrap();
        assert_eq!(parts.slug, "count");
        assert_eq!(parts.args, vec!["age", "25"]);
        assert_eq!(parts.output_name.as_deref(), Some("Twenty fives"));
    }

    #[test]
    fn aggy_parts_bare() {
        let parts = aggy_parts("count").unwrap();
        assert_eq!(parts.slug, "count");
        assert!(parts.args.is_empty());
        assert_eq!(parts.output_name, None);
    }

    #[test]
    fn aggy_parts_empty_title_is_absent() {
        let parts = aggy_parts("sum:age|").unwrap();
        assert_eq!(parts.output_name, None);
    }

    #[test]
    fn aggy_parts_quoted() {
        let parts = aggy_parts("count:hello,\"foo, Bar!t\"").unwrap();
        assert_eq!(parts.args, vec!["hello", "foo, Bar!t"]);

        let parts = aggy_parts("max:\"a:b\"|\"x|y\"").unwrap();
        assert_eq!(parts.args, vec!["a:b"]);
        assert_eq!(parts.output_name.as_deref(), Some("x|y"));
    }

    #[test]
    fn aggy_parts_too_many_sections() {
        assert!(matches!(
            aggy_parts("sum:a|b|c"),
            Err(Error::MalformedAggregation { .. })
        ));
        assert!(matches!(
            aggy_parts("sum:a:b"),
            Err(Error::MalformedAggregation { .. })
        ));
    }
}
