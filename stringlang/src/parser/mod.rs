//! Parser implementation using lalrpop

use crate::ast::{Program, Span};
use crate::error::{CompileError, ErrorToken, Result};
use crate::lexer::{Token, tokenize};
use lalrpop_util::ParseError;

#[cfg(test)]
mod tests;

lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar
);

/// Parse tokens into AST
pub fn parse(_filename: &str, _source: &str, tokens: Vec<(Token, Span)>) -> Result<Program> {
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (span.start, tok, span.end));

    grammar::ProgramParser::new()
        .parse(token_iter)
        .map_err(|e| {
            let (token, span) = match &e {
                ParseError::InvalidToken { location } => (
                    ErrorToken::Invalid(String::new()),
                    Span::new(*location, *location + 1),
                ),
                ParseError::UnrecognizedEof { location, .. } => {
                    (ErrorToken::EndOfInput, Span::point(*location))
                }
                ParseError::UnrecognizedToken { token, .. }
                | ParseError::ExtraToken { token } => (
                    ErrorToken::Unexpected {
                        kind: token.1.kind_name(),
                        literal: token.1.to_string(),
                    },
                    Span::new(token.0, token.2),
                ),
                ParseError::User { error } => {
                    (ErrorToken::Invalid(error.clone()), Span::new(0, 0))
                }
            };
            CompileError::parser(format!("{e}"), token, span)
        })
}

/// Tokenize and parse a complete source text
pub fn parse_source(filename: &str, source: &str) -> Result<Program> {
    let tokens = tokenize(source)?;
    parse(filename, source, tokens)
}
