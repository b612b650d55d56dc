//! Error types and reporting

use crate::ast::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// The token a lexer or parser error points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorToken {
    /// Input ended before the program was complete
    EndOfInput,
    /// Text the lexer could not turn into a token
    Invalid(String),
    /// A well-formed token in the wrong place
    Unexpected { kind: &'static str, literal: String },
}

impl ErrorToken {
    pub fn kind(&self) -> &'static str {
        match self {
            ErrorToken::EndOfInput => "end of input",
            ErrorToken::Invalid(_) => "invalid",
            ErrorToken::Unexpected { kind, .. } => kind,
        }
    }

    pub fn literal(&self) -> &str {
        match self {
            ErrorToken::EndOfInput => "",
            ErrorToken::Invalid(literal) | ErrorToken::Unexpected { literal, .. } => literal,
        }
    }
}

/// Compile error
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lexer error at {span}: {message}")]
    Lexer {
        message: String,
        token: ErrorToken,
        span: Span,
    },

    #[error("Parser error at {span}: {message}")]
    Parser {
        message: String,
        token: ErrorToken,
        span: Span,
    },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, slice: &str, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            token: ErrorToken::Invalid(slice.to_string()),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, token: ErrorToken, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            token,
            span,
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Parser { span, .. } => Some(*span),
            Self::Io { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. } | Self::Parser { message, .. } => message,
            Self::Io { message } => message,
        }
    }

    /// The offending token, for lexer and parser errors
    pub fn error_token(&self) -> Option<&ErrorToken> {
        match self {
            Self::Lexer { token, .. } | Self::Parser { token, .. } => Some(token),
            Self::Io { .. } => None,
        }
    }

    /// True when more input could still make the source parse: the error is at
    /// end of input, or inside a string literal that has not been closed yet.
    pub fn needs_more_input(&self) -> bool {
        match self.error_token() {
            Some(ErrorToken::EndOfInput) => true,
            Some(token) => token.literal().starts_with('"'),
            None => false,
        }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::io_error(e.to_string())
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = match error {
        CompileError::Lexer { .. } => "Lexer",
        CompileError::Parser { .. } => "Parser",
        CompileError::Io { .. } => "IO",
    };

    let result = if let Some(span) = error.span() {
        Report::build(ReportKind::Error, (filename, span.start..span.end))
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source)))
    } else {
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{kind} error: {}", error.message()))
            .finish()
            .eprint((filename, Source::from(source)))
    };

    if result.is_err() {
        eprintln!("{error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_needs_more_input() {
        let err = CompileError::parser("eof", ErrorToken::EndOfInput, Span::point(3));
        assert!(err.needs_more_input());
        assert_eq!(err.error_token().map(|t| t.kind()), Some("end of input"));
    }

    #[test]
    fn test_unexpected_token_is_fatal() {
        let token = ErrorToken::Unexpected {
            kind: "punctuation",
            literal: ")".to_string(),
        };
        let err = CompileError::parser("bad", token, Span::new(0, 1));
        assert!(!err.needs_more_input());
        assert_eq!(err.error_token().map(|t| t.literal()), Some(")"));
    }

    #[test]
    fn test_open_string_needs_more_input() {
        let err = CompileError::lexer("open", "\"abc", Span::new(0, 4));
        assert!(err.needs_more_input());
    }

    #[test]
    fn test_display_includes_span() {
        let err = CompileError::lexer("unexpected character: \"#\"", "#", Span::new(2, 3));
        assert_eq!(err.to_string(), "Lexer error at 2..3: unexpected character: \"#\"");
    }

    #[test]
    fn test_io_error_has_no_span() {
        let err = CompileError::io_error("missing");
        assert!(err.span().is_none());
        assert!(err.error_token().is_none());
        assert!(!err.needs_more_input());
    }
}
