//! Lexer and parser for JSON-Shapes documents.
//!
//! The accepted grammar is the intersection of what a JSON-superset parser,
//! JavaScript and Python all read: JSON literals, `identifier(args)` calls,
//! bare identifiers, `name = expr` definitions and `;` separators. There are
//! no comments because the host languages disagree on their syntax.
//!
//! ```text
//! tree = object({"label": string(), "children": list(tree)});
//! ```

mod lexer;
mod parser;
mod token;

pub use lexer::{LexError, LexErrorKind, tokenize};
pub use parser::{ParseError, parse};
pub use token::{Token, TokenKind, is_reserved};

use rhizome_jsonshapes_ir::Statement;
use thiserror::Error;

/// Either stage of turning text into statements can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Tokenize and parse a document in one step.
pub fn parse_source(source: &str) -> Result<Vec<Statement>, SyntaxError> {
    let tokens = tokenize(source)?;
    let statements = parse(&tokens)?;
    tracing::debug!(
        statements = statements.len(),
        tokens = tokens.len(),
        "parsed shape document"
    );
    Ok(statements)
}

#[cfg(test)]
mod tests;
