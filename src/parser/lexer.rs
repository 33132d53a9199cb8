// Token-level parsers shared by the event script

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not},
    character::complete::{char, digit1, space0},
    combinator::{map, map_res, opt, recognize, value},
    sequence::{delimited, pair},
    IResult,
};

/// Surround a parser with optional spaces and tabs (never newlines)
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(space0, inner, space0)
}

/// Double-quoted string; `\"` and `\\` are the only escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        map(tag_empty, |_| String::new()),
        delimited(
            char('"'),
            escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", char('\\')), value("\"", char('"')))),
            ),
            char('"'),
        ),
    ))(input)
}

fn tag_empty(input: &str) -> IResult<&str, &str> {
    nom::bytes::complete::tag("\"\"")(input)
}

/// Unsigned integer
pub fn unsigned(input: &str) -> IResult<&str, u64> {
    map_res(digit1, str::parse)(input)
}

/// Optionally signed integer
pub fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("\"India\" rest"), Ok((" rest", "India".to_string())));
        assert_eq!(
            string_literal(r#""Congo, \"Dem. Rep.\"""#),
            Ok(("", "Congo, \"Dem. Rep.\"".to_string()))
        );
        assert_eq!(string_literal("\"\""), Ok(("", String::new())));
        assert!(string_literal("India").is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(unsigned("42x"), Ok(("x", 42)));
        assert_eq!(integer("-7"), Ok(("", -7)));
        assert!(unsigned("-7").is_err());
    }

    #[test]
    fn test_ws_stops_at_newline() {
        let mut p = ws(unsigned);
        assert_eq!(p("  3 \nnext"), Ok(("\nnext", 3)));
    }
}
