//! Formula analysis: syntax pre-check, field-reference extraction and the
//! formula dependency graph.
//!
//! Reference extraction is lexical. It strips quoted literals, collects
//! identifier-like words and drops the reserved SQL vocabulary. It does not
//! understand expression structure, so a syntactically odd but
//! well-parenthesized expression can pass [`check_syntax`].

pub mod graph;
mod keywords;
mod lexer;

pub use graph::{DependencyGraph, find_cycles};
pub use keywords::{RESERVED_WORDS, is_reserved};
pub use lexer::{Spanned, Token, tokenize};

use thiserror::Error;

/// Structural problem found by [`check_syntax`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaSyntaxError {
    #[error("expression is empty")]
    Empty,

    #[error("consecutive operators '{first}' and '{second}' at position {position}")]
    ConsecutiveOperators {
        first: String,
        second: String,
        position: usize,
    },

    #[error("operator '{operator}' is missing an operand at position {position}")]
    MissingOperand { operator: String, position: usize },

    #[error("unmatched ')' at position {position}")]
    UnmatchedClosing { position: usize },

    #[error("unclosed '(' at position {position}")]
    Unclosed { position: usize },

    #[error("empty parentheses at position {position}")]
    EmptyParentheses { position: usize },

    #[error("unterminated string literal at position {position}")]
    UnterminatedString { position: usize },

    #[error("'{token}' is not allowed in an expression (position {position})")]
    Forbidden { token: String, position: usize },
}

/// Binary operator spelling, if the token is one. Word operators count.
fn binary_operator<'a>(token: &Token<'a>) -> Option<&'a str> {
    match token {
        Token::Op(op) => Some(*op),
        Token::Ident(word)
            if word.eq_ignore_ascii_case("and") || word.eq_ignore_ascii_case("or") =>
        {
            Some(*word)
        }
        _ => None,
    }
}

/// Operators that may also appear in prefix position.
fn is_unary(token: &Token<'_>) -> bool {
    matches!(token, Token::Op("-") | Token::Op("+"))
        || matches!(token, Token::Ident(w) if w.eq_ignore_ascii_case("not"))
}

/// Reject consecutive binary operators, unbalanced or empty parentheses,
/// unterminated strings and statement/comment tokens.
pub fn check_syntax(expression: &str) -> Result<(), FormulaSyntaxError> {
    let tokens = tokenize(expression);
    if tokens.is_empty() {
        return Err(FormulaSyntaxError::Empty);
    }

    let mut open: Vec<usize> = Vec::new();
    let mut prev: Option<Spanned<'_>> = None;

    for (i, spanned) in tokens.iter().enumerate() {
        let position = spanned.offset;
        match spanned.token {
            Token::UnterminatedStr => {
                return Err(FormulaSyntaxError::UnterminatedString { position });
            }
            Token::Forbidden(token) => {
                return Err(FormulaSyntaxError::Forbidden {
                    token: token.to_string(),
                    position,
                });
            }
            Token::LParen => {
                if matches!(tokens.get(i + 1).map(|t| t.token), Some(Token::RParen))
                    && !matches!(prev.map(|p| p.token), Some(Token::Ident(_)))
                {
                    return Err(FormulaSyntaxError::EmptyParentheses { position });
                }
                open.push(position);
            }
            Token::RParen => {
                if open.pop().is_none() {
                    return Err(FormulaSyntaxError::UnmatchedClosing { position });
                }
                if let Some(op) = prev.as_ref().and_then(|p| binary_operator(&p.token)) {
                    return Err(FormulaSyntaxError::MissingOperand {
                        operator: op.to_string(),
                        position: prev.map(|p| p.offset).unwrap_or(position),
                    });
                }
            }
            ref token => {
                if let Some(second) = binary_operator(token) {
                    let after_operand = prev.is_some_and(|p| {
                        !matches!(p.token, Token::LParen | Token::Comma)
                            && binary_operator(&p.token).is_none()
                    });
                    if !after_operand && !is_unary(token) {
                        return match prev.as_ref().and_then(|p| binary_operator(&p.token)) {
                            Some(first) => Err(FormulaSyntaxError::ConsecutiveOperators {
                                first: first.to_string(),
                                second: second.to_string(),
                                position,
                            }),
                            None => Err(FormulaSyntaxError::MissingOperand {
                                operator: second.to_string(),
                                position,
                            }),
                        };
                    }
                }
            }
        }
        prev = Some(*spanned);
    }

    if let Some(last) = prev {
        if let Some(op) = binary_operator(&last.token) {
            return Err(FormulaSyntaxError::MissingOperand {
                operator: op.to_string(),
                position: last.offset,
            });
        }
    }

    if let Some(position) = open.pop() {
        return Err(FormulaSyntaxError::Unclosed { position });
    }

    Ok(())
}

/// Candidate field names referenced by `expression`, in first-occurrence order.
pub fn extract_references(expression: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for spanned in tokenize(expression) {
        if let Token::Ident(word) = spanned.token {
            if !is_reserved(word) && !refs.iter().any(|r| r == word) {
                refs.push(word.to_string());
            }
        }
    }
    refs
}
