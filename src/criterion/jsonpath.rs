//! A `nom`-based JSONPath syntax checker.
//!
//! Covers the RFC 9535 query grammar: root `$`, child and descendant segments,
//! name/wildcard/index/slice/filter selectors, and filter expressions with
//! comparisons, `&&`/`||`/`!`, parentheses, `@` queries and function calls.
//! Nothing is evaluated; a query either parses completely or it does not.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list1},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded, terminated},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum JsonPathError {
    #[error("invalid jsonpath expression '{path}': {details}")]
    Syntax { path: String, details: String },

    #[error("invalid jsonpath expression '{path}': unexpected input at '{remainder}'")]
    Trailing { path: String, remainder: String },
}

// --- Main Public Parser ---

pub fn validate(path: &str) -> Result<(), JsonPathError> {
    match query(path) {
        Ok(("", ())) => Ok(()),
        Ok((rem, _)) => Err(JsonPathError::Trailing {
            path: path.to_string(),
            remainder: rem.to_string(),
        }),
        Err(e) => Err(JsonPathError::Syntax {
            path: path.to_string(),
            details: e.to_string(),
        }),
    }
}

// --- Queries and Segments ---

fn query(input: &str) -> IResult<&str, ()> {
    value((), pair(char('$'), segments)).parse(input)
}

fn relative_query(input: &str) -> IResult<&str, ()> {
    value((), pair(char('@'), segments)).parse(input)
}

fn filter_query(input: &str) -> IResult<&str, ()> {
    alt((relative_query, query)).parse(input)
}

fn segments(input: &str) -> IResult<&str, ()> {
    value((), many0(preceded(multispace0, segment))).parse(input)
}

fn segment(input: &str) -> IResult<&str, ()> {
    alt((descendant_segment, child_segment)).parse(input)
}

fn descendant_segment(input: &str) -> IResult<&str, ()> {
    value(
        (),
        preceded(tag(".."), alt((bracketed_selection, wildcard, member_name))),
    )
    .parse(input)
}

fn child_segment(input: &str) -> IResult<&str, ()> {
    alt((
        bracketed_selection,
        value((), preceded(char('.'), alt((wildcard, member_name)))),
    ))
    .parse(input)
}

fn is_name_first(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_first(c) || c.is_ascii_digit()
}

fn member_name(input: &str) -> IResult<&str, ()> {
    value((), pair(satisfy(is_name_first), take_while(is_name_char))).parse(input)
}

fn wildcard(input: &str) -> IResult<&str, ()> {
    value((), char('*')).parse(input)
}

// --- Selectors ---

fn bracketed_selection(input: &str) -> IResult<&str, ()> {
    value(
        (),
        delimited(char('['), separated_list1(char(','), ws(selector)), char(']')),
    )
    .parse(input)
}

fn selector(input: &str) -> IResult<&str, ()> {
    // Slice before index: both start with an integer
    alt((string_literal, wildcard, slice_selector, integer, filter_selector)).parse(input)
}

fn integer(input: &str) -> IResult<&str, ()> {
    value((), recognize(pair(opt(char('-')), digit1))).parse(input)
}

fn slice_selector(input: &str) -> IResult<&str, ()> {
    value(
        (),
        (
            opt(terminated(integer, multispace0)),
            char(':'),
            multispace0,
            opt(terminated(integer, multispace0)),
            opt(preceded(char(':'), preceded(multispace0, opt(integer)))),
        ),
    )
    .parse(input)
}

fn filter_selector(input: &str) -> IResult<&str, ()> {
    value((), preceded(char('?'), preceded(multispace0, logical_or))).parse(input)
}

// --- Filter Expressions ---

fn logical_or(input: &str) -> IResult<&str, ()> {
    value((), separated_list1(ws(tag("||")), logical_and)).parse(input)
}

fn logical_and(input: &str) -> IResult<&str, ()> {
    value((), separated_list1(ws(tag("&&")), basic_expression)).parse(input)
}

fn basic_expression(input: &str) -> IResult<&str, ()> {
    alt((comparison, parenthesized, test_expression)).parse(input)
}

fn negation(input: &str) -> IResult<&str, ()> {
    value((), opt(terminated(char('!'), multispace0))).parse(input)
}

fn parenthesized(input: &str) -> IResult<&str, ()> {
    value((), (negation, char('('), ws(logical_or), char(')'))).parse(input)
}

fn test_expression(input: &str) -> IResult<&str, ()> {
    value((), pair(negation, alt((function_call, filter_query)))).parse(input)
}

fn comparison(input: &str) -> IResult<&str, ()> {
    value((), (comparable, ws(comparison_operator), comparable)).parse(input)
}

fn comparison_operator(input: &str) -> IResult<&str, ()> {
    value(
        (),
        alt((tag("=="), tag("!="), tag("<="), tag(">="), tag("<"), tag(">"))),
    )
    .parse(input)
}

fn comparable(input: &str) -> IResult<&str, ()> {
    alt((literal, function_call, filter_query)).parse(input)
}

// --- Function Calls ---

fn function_name(input: &str) -> IResult<&str, ()> {
    value(
        (),
        pair(
            satisfy(|c| c.is_ascii_lowercase()),
            take_while(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
        ),
    )
    .parse(input)
}

fn function_call(input: &str) -> IResult<&str, ()> {
    value(
        (),
        (
            function_name,
            char('('),
            multispace0,
            opt(separated_list1(ws(char(',')), function_argument)),
            multispace0,
            char(')'),
        ),
    )
    .parse(input)
}

fn function_argument(input: &str) -> IResult<&str, ()> {
    alt((logical_or, literal, filter_query, function_call)).parse(input)
}

// --- Literal Parsers ---

fn literal(input: &str) -> IResult<&str, ()> {
    alt((
        string_literal,
        value((), recognize_float),
        value((), tag("true")),
        value((), tag("false")),
        value((), tag("null")),
    ))
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, ()> {
    alt((single_quoted, double_quoted)).parse(input)
}

fn single_quoted(input: &str) -> IResult<&str, ()> {
    quoted(input, '\'')
}

fn double_quoted(input: &str) -> IResult<&str, ()> {
    quoted(input, '"')
}

/// A quoted string where `\` escapes the following character
fn quoted(input: &str, quote: char) -> IResult<&str, ()> {
    let (mut rest, _) = char(quote).parse(input)?;
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => return Err(nom::Err::Error(Error::new(rest, ErrorKind::Char))),
            Some('\\') => {
                if chars.next().is_none() {
                    return Err(nom::Err::Error(Error::new(rest, ErrorKind::Escaped)));
                }
                rest = chars.as_str();
            }
            Some(c) if c == quote => return Ok((chars.as_str(), ())),
            Some(_) => rest = chars.as_str(),
        }
    }
}

/// A combinator that takes a parser `inner` and produces a parser that consumes surrounding whitespace.
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_rfc9535_queries() {
        for path in [
            "$",
            "$.store.book[*].author",
            "$..author",
            "$.store.*",
            "$.store..price",
            "$..book[2]",
            "$..book[-1]",
            "$..book[0,1]",
            "$..book[:2]",
            "$..book[1:5:2]",
            "$..book[ 0 , 'title' ]",
            "$['store']['book']",
            "$[\"it's\"]",
            "$..book[?@.isbn]",
            "$..book[?(@.price < 10)]",
            "$..book[?@.price<10 && @.category=='fiction']",
            "$..book[?!(@.price > 10 || @.sold == true)]",
            "$[?length(@.name) > 3]",
            "$[?match(@.date, '1974-05-..')]",
            "$.pets[?(@.name == 'Fluffy Cat')]",
            "$[?@.a == $.b]",
            "$.données",
        ] {
            assert_eq!(validate(path), Ok(()), "expected '{path}' to parse");
        }
    }

    #[test]
    fn rejects_malformed_queries() {
        for path in [
            "",
            "$[invalid jsonpath",
            "store.book",
            "$.",
            "$[",
            "$..",
            "$.store[?]",
            "$.a[1:2:3:4]",
            "$['unterminated]",
            "$.a[?(@.b == 1]",
        ] {
            assert!(validate(path).is_err(), "expected '{path}' to fail");
        }
    }

    #[test]
    fn error_names_the_path() {
        let err = validate("$[invalid jsonpath").unwrap_err();
        assert!(err.to_string().contains("invalid jsonpath expression"));
        assert!(err.to_string().contains("$[invalid jsonpath"));
    }
}
