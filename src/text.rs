//! Text helpers shared by the utilities.

use std::sync::LazyLock;

use regex::Regex;

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\p{Zs}]").expect("static regex"));
static VERTICAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\x0B\x0C]").expect("static regex"));
static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("static regex"));
static NEWLINE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("static regex"));
static ANY_SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \n]+").expect("static regex"));

/// Lowercase `text` and collapse every run of non-alphanumeric characters
/// into a single underscore. Apostrophes are dropped.
///
/// ```
/// assert_eq!(csvmedkit::text::slugify("Hello, World's End!"), "hello_worlds_end");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut gap = false;
    for c in text.chars() {
        if c == '\'' {
            continue;
        }
        if c.is_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('_');
            }
            gap = false;
            slug.extend(c.to_lowercase());
        } else {
            gap = true;
        }
    }
    slug
}

/// Horizontal whitespace becomes a space; carriage returns, vertical tabs
/// and form feeds become newlines.
pub fn norm_chars(text: &str) -> String {
    let text = HORIZONTAL_SPACE.replace_all(text, " ");
    VERTICAL_SPACE.replace_all(&text, "\n").into_owned()
}

/// Collapse runs of spaces and newlines. Expects [`norm_chars`] output.
pub fn squeeze_space(text: &str, keep_lines: bool) -> String {
    if keep_lines {
        let text = SPACE_RUN.replace_all(text, " ");
        NEWLINE_RUN.replace_all(&text, "\n").into_owned()
    } else {
        ANY_SPACE_RUN.replace_all(text, " ").into_owned()
    }
}

/// Normalize whitespace and trim.
pub fn normalize(text: &str, keep_lines: bool) -> String {
    squeeze_space(&norm_chars(text), keep_lines).trim().to_string()
}

/// Greedy word wrap to lines of at most `width` characters.
///
/// Whitespace runs, newlines included, separate words. Words longer than
/// `width` are broken. Empty or blank text wraps to no lines.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
            if needed <= width {
                if line_len > 0 {
                    line.push(' ');
                    line_len += 1;
                }
                line.extend(word.iter());
                line_len += word.len();
                break;
            }
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
                continue;
            }
            let rest = word.split_off(width);
            lines.push(word.iter().collect());
            word = rest;
        }
    }
    if line_len > 0 {
        lines.push(line);
    }
    lines
}

/// Translate `\1` and `\g<name>` group references in a replacement into the
/// `${1}` and `${name}` forms understood by [`Regex::replace_all`].
///
/// `\n`, `\t` and `\\` become a newline, a tab and a backslash. A `$` is
/// an ordinary character and is escaped as `$$`.
pub fn regex_replacement(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&escape_dollars(&rest[..pos]));
        let after = &rest[pos + 1..];
        let digits = after.len() - after.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits > 0 {
            out.push_str(&format!("${{{}}}", &after[..digits]));
            rest = &after[digits..];
        } else if let Some(named) = after.strip_prefix("g<")
            && let Some(end) = named.find('>')
        {
            out.push_str(&format!("${{{}}}", &named[..end]));
            rest = &named[end + 1..];
        } else if let Some(tail) = after.strip_prefix('n') {
            out.push('\n');
            rest = tail;
        } else if let Some(tail) = after.strip_prefix('t') {
            out.push('\t');
            rest = tail;
        } else if let Some(tail) = after.strip_prefix('\\') {
            out.push('\\');
            rest = tail;
        } else {
            out.push('\\');
            rest = after;
        }
    }
    out.push_str(&escape_dollars(rest));
    out
}

fn escape_dollars(text: &str) -> String {
    text.replace('$', "$$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("sum of age", "sum_of_age")]
    #[case("count of", "count_of")]
    #[case("count of hello foo, Bar!t", "count_of_hello_foo_bar_t")]
    #[case("  --Leading and trailing--  ", "leading_and_trailing")]
    #[case("snake_case already", "snake_case_already")]
    #[case("Don't Stop", "dont_stop")]
    #[case("Ünïcode Straße", "ünïcode_straße")]
    #[case("!!!", "")]
    fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn norm_chars_converts_exotic_whitespace() {
        assert_eq!(norm_chars("a\tb\u{a0}c"), "a b c");
        assert_eq!(norm_chars("a\rb\x0Bc\x0Cd"), "a\nb\nc\nd");
    }

    #[test]
    fn normalize_collapses_lines() {
        assert_eq!(normalize("  hello \r\n\n  world  ", false), "hello world");
        assert_eq!(normalize("  hello  \n\n world ", true), "hello \n world");
    }

    #[test]
    fn wrap_greedy() {
        assert_eq!(
            wrap("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn wrap_breaks_long_words() {
        assert_eq!(wrap("abcdefghij xy", 4), vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn wrap_blank_text() {
        assert!(wrap("   ", 5).is_empty());
        assert!(wrap("", 5).is_empty());
    }

    #[test]
    fn replacement_group_references() {
        assert_eq!(regex_replacement(r"\1!"), "${1}!");
        assert_eq!(regex_replacement(r"\12x"), "${12}x");
        assert_eq!(regex_replacement(r"<\g<word>>"), "<${word}>");
        assert_eq!(regex_replacement("$1 and $$"), "$$1 and $$$$");
        assert_eq!(regex_replacement(r"a\tb\\c\-d"), "a\tb\\c\\-d");
    }

    #[test]
    fn replacement_keeps_dollars_literal() {
        let re = Regex::new(r"(\d+)").unwrap();
        let template = regex_replacement(r"$\1");
        assert_eq!(re.replace_all("cost 12", template.as_str()), "cost $12");
        let template = regex_replacement("$5.00");
        assert_eq!(Regex::new("price").unwrap().replace_all("price", template.as_str()), "$5.00");
    }

    #[test]
    fn replacement_applies_with_regex() {
        let re = Regex::new(r"(\w+)@(\w+)").unwrap();
        let template = regex_replacement(r"\2 at \1");
        assert_eq!(re.replace_all("joe@home", template.as_str()), "home at joe");
    }
}
