use crate::parser::ParseError;
use crate::vm::Value;
use std::fmt;
use thiserror::Error;

/// Everything the library API can fail with. Script-level throws and
/// parse errors carry positions; an interrupt is terminal and carries
/// nothing.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseErrorList),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("execution interrupted")]
    Interrupted,
}

/// One or more parse errors from a single program. The first is the
/// primary message; the rest are summarized by count.
#[derive(Debug)]
pub struct ParseErrorList {
    pub filename: String,
    pub errors: Vec<ParseError>,
}

impl fmt::Display for ParseErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.first() {
            Some(first) => {
                write!(
                    f,
                    "SyntaxError: ({}): Line {}:{} {}",
                    self.filename, first.line, first.column, first.message
                )?;
                if self.errors.len() > 1 {
                    write!(f, " (and {} more errors)", self.errors.len() - 1)?;
                }
                Ok(())
            }
            None => write!(f, "SyntaxError: ({})", self.filename),
        }
    }
}

impl std::error::Error for ParseErrorList {}

/// An uncaught script throw, stringified as `"<ErrorKind>: <message>"`.
/// The thrown value itself stays reachable through `value`.
#[derive(Debug)]
pub struct ScriptError {
    pub message: String,
    pub filename: String,
    pub line: u32,
    pub column: u32,
    pub value: Value,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ScriptError {
    pub fn location(&self) -> (u32, u32) {
        (self.line, self.column)
    }
}

impl std::error::Error for ScriptError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_list_formatting() {
        let list = ParseErrorList {
            filename: "<anonymous>".to_string(),
            errors: vec![
                ParseError {
                    message: "Unexpected token".to_string(),
                    line: 2,
                    column: 7,
                },
                ParseError {
                    message: "Unexpected end of input".to_string(),
                    line: 3,
                    column: 1,
                },
            ],
        };
        assert_eq!(
            list.to_string(),
            "SyntaxError: (<anonymous>): Line 2:7 Unexpected token (and 1 more errors)"
        );
    }
}
