//! Tokens of the shape grammar.

use rhizome_jsonshapes_ir::Position;
use std::fmt;

/// Words reserved by JavaScript or Python. A document using one as a name
/// would not load in that host, so they are rejected as definition names and
/// references. `not` stays callable as a shape function.
const RESERVED: &[&str] = &[
    // JavaScript
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "finally", "for", "function", "if",
    "implements", "import", "in", "instanceof", "interface", "let", "new", "package", "private",
    "protected", "public", "return", "static", "super", "switch", "this", "throw", "try",
    "typeof", "var", "void", "while", "with", "yield",
    // Python
    "False", "None", "True", "and", "as", "assert", "async", "def", "del", "elif", "except",
    "from", "global", "is", "lambda", "nonlocal", "not", "or", "pass", "raise",
];

/// True for identifiers that are keywords in one of the host languages.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A JSON string, already unescaped
    String(String),
    /// A JSON number
    Number(serde_json::Number),
    True,
    False,
    Null,
    Ident(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Colon,
    Semicolon,
    Equals,
    Eof,
}

impl TokenKind {
    /// The keyword spelling, for `true`/`false`/`null`.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            TokenKind::True => Some("true"),
            TokenKind::False => Some("false"),
            TokenKind::Null => Some("null"),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::String(s) => write!(f, "string {s:?}"),
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::True => write!(f, "'true'"),
            TokenKind::False => write!(f, "'false'"),
            TokenKind::Null => write!(f, "'null'"),
            TokenKind::Ident(name) => write!(f, "identifier '{name}'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Equals => write!(f, "'='"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token with the raw source text it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}
