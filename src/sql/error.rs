use std::fmt;

use crate::sql::parser::lexer::Pos;

/// Errors produced while compiling a statement.
///
/// Lexical problems surface as parse errors: the scanner never fails, it
/// emits sentinel tokens that the parser reports from the position they
/// occurred at. Semantic errors come out of post-parse validation and the
/// DSL emitter and carry a message only.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlError {
    /// Syntax errors with found/expected token information
    Parse {
        message: Option<String>,
        found: String,
        expected: Vec<String>,
        pos: Pos,
    },

    /// Statement-level validation and emission errors
    Semantic { message: String },
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlError::Parse {
                message,
                found,
                expected,
                pos,
            } => {
                // Positions are zero-based internally, one-based for humans.
                if let Some(msg) = message {
                    write!(f, "{} at line {}, char {}", msg, pos.line + 1, pos.column + 1)
                } else {
                    write!(
                        f,
                        "found {}, expected {} at line {}, char {}",
                        found,
                        expected.join(", "),
                        pos.line + 1,
                        pos.column + 1
                    )
                }
            }
            SqlError::Semantic { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for SqlError {}

impl SqlError {
    /// Create a parse error from the token that was found and the list of
    /// alternatives that would have been accepted.
    pub fn parse_error(found: impl Into<String>, expected: &[&str], pos: Pos) -> Self {
        SqlError::Parse {
            message: None,
            found: found.into(),
            expected: expected.iter().map(|s| s.to_string()).collect(),
            pos,
        }
    }

    /// Create a parse error with a free-form message.
    pub fn parse_message(message: impl Into<String>, pos: Pos) -> Self {
        SqlError::Parse {
            message: Some(message.into()),
            found: String::new(),
            expected: Vec::new(),
            pos,
        }
    }

    /// Create a semantic error.
    pub fn semantic(message: impl Into<String>) -> Self {
        SqlError::Semantic {
            message: message.into(),
        }
    }
}

/// Result type for SQL compilation.
pub type SqlResult<T> = Result<T, SqlError>;
