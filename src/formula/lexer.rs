//! Tokenizer for formula and CHECK expressions.
//!
//! This is a lexer, not a parser: it recognizes literals, identifiers,
//! operators and parentheses, and nothing about expression structure.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{
        alpha1, alphanumeric1, anychar, char, digit0, digit1, multispace0, one_of,
    },
    combinator::{map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, tuple},
};

/// A lexical token borrowed from the source expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Ident(&'a str),
    Number(&'a str),
    /// Quoted literal, quotes excluded
    Str(&'a str),
    /// Symbolic operator (`+`, `<=`, `||`, ...)
    Op(&'a str),
    /// `::` type cast
    Cast,
    LParen,
    RParen,
    Comma,
    /// Statement separators and comment openers
    Forbidden(&'a str),
    /// A quote with no closing partner
    UnterminatedStr,
    Other(char),
}

/// A token plus its byte offset in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub offset: usize,
}

/// Split `input` into tokens. Never fails: unknown characters become [`Token::Other`].
pub fn tokenize(input: &str) -> Vec<Spanned<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    loop {
        let Ok((after_ws, _)) = multispace0::<&str, nom::error::Error<&str>>(rest) else {
            break;
        };
        rest = after_ws;
        if rest.is_empty() {
            break;
        }
        let offset = input.len() - rest.len();
        match parse_token(rest) {
            Ok((next, token)) => {
                tokens.push(Spanned { token, offset });
                rest = next;
            }
            Err(_) => break,
        }
    }

    tokens
}

fn parse_token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        map(single_quoted, Token::Str),
        map(double_quoted, Token::Str),
        map(alt((tag("'"), tag("\""))), |_| Token::UnterminatedStr),
        map(alt((tag(";"), tag("--"), tag("/*"))), Token::Forbidden),
        map(number, Token::Number),
        map(identifier, Token::Ident),
        map(tag("::"), |_| Token::Cast),
        map(operator, Token::Op),
        map(char('('), |_| Token::LParen),
        map(char(')'), |_| Token::RParen),
        map(char(','), |_| Token::Comma),
        map(anychar, Token::Other),
    ))(input)
}

/// `'...'` with `''` as an escaped quote.
fn single_quoted(input: &str) -> IResult<&str, &str> {
    delimited(
        char('\''),
        recognize(many0(alt((tag("''"), is_not("'"))))),
        char('\''),
    )(input)
}

fn double_quoted(input: &str) -> IResult<&str, &str> {
    delimited(
        char('"'),
        recognize(many0(alt((tag("\"\""), is_not("\""))))),
        char('"'),
    )(input)
}

/// Integer, decimal and exponent forms; trailing letters are swallowed so
/// `1e5` or `10px` never yield identifier fragments.
fn number(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        digit1,
        opt(pair(char('.'), digit0)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        many0(alt((alphanumeric1, tag("_")))),
    )))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn operator(input: &str) -> IResult<&str, &str> {
    alt((
        tag("||"),
        tag("<="),
        tag(">="),
        tag("<>"),
        tag("!="),
        tag("+"),
        tag("-"),
        tag("*"),
        tag("/"),
        tag("%"),
        tag("^"),
        tag("="),
        tag("<"),
        tag(">"),
    ))(input)
}
