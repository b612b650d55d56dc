//! Token definitions

use logos::Logos;
use std::fmt;

/// stringlang token
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // Keywords
    #[token("fun")]
    Fun,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,

    // Operators
    #[token("||")]
    PipePipe,
    #[token("&&")]
    AmpAmp,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("+")]
    Plus,
    #[token("=")]
    Eq,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    // Literals
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    StringLit(String),

    /// Integer literal, kept as written (only used as an index)
    #[regex("[0-9]+", |lex| lex.slice().to_string())]
    IntLit(String),

    /// Program argument reference: `$0`, `$1`, ...
    #[regex(r"\$[0-9]+", |lex| lex.slice()[1..].parse::<usize>().ok())]
    Arg(usize),

    #[regex("[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Token {
    /// Short name of the token class, used in error reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            Token::Fun | Token::If | Token::Else | Token::While => "keyword",
            Token::PipePipe | Token::AmpAmp | Token::EqEq | Token::NotEq | Token::Plus => {
                "operator"
            }
            Token::Eq => "assignment",
            Token::LParen
            | Token::RParen
            | Token::LBrace
            | Token::RBrace
            | Token::LBracket
            | Token::RBracket
            | Token::Comma
            | Token::Semi => "punctuation",
            Token::StringLit(_) => "string",
            Token::IntLit(_) => "integer",
            Token::Arg(_) => "argument",
            Token::Ident(_) => "identifier",
        }
    }
}

/// Decode a quoted literal. Returns `None` on an unknown escape.
fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'u' => {
                if chars.next()? != '{' {
                    return None;
                }
                let hex: String = chars.by_ref().take_while(|&c| c != '}').collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Fun => write!(f, "fun"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::PipePipe => write!(f, "||"),
            Token::AmpAmp => write!(f, "&&"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Plus => write!(f, "+"),
            Token::Eq => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Semi => write!(f, ";"),
            Token::StringLit(s) => write!(f, "{}", crate::ast::quote(s)),
            Token::IntLit(s) => write!(f, "{s}"),
            Token::Arg(n) => write!(f, "${n}"),
            Token::Ident(s) => write!(f, "{s}"),
        }
    }
}
