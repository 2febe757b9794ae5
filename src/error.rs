// ABOUTME: Runtime and compile-time error types for the Duso interpreter

use crate::token::Position;
use thiserror::Error;

/// One entry of the call stack attached to runtime errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub function_name: String,
    pub file: String,
    pub position: Position,
}

/// Every failure in the pipeline (lexical, syntactic, runtime) is a
/// DusoError carrying a message, the source file, a position, and the
/// call stack active when it was raised.
///
/// `try`/`catch` in scripts binds only the message string; the rendered
/// form below is what hosts and the CLI see.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", self.render())]
pub struct DusoError {
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub stack: Vec<Frame>,
}

impl DusoError {
    pub fn new(message: impl Into<String>, file: &str, pos: Position) -> Self {
        DusoError {
            message: message.into(),
            file: file.to_string(),
            line: pos.line,
            column: pos.column,
            stack: Vec::new(),
        }
    }

    pub fn with_stack(mut self, stack: Vec<Frame>) -> Self {
        self.stack = stack;
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn render(&self) -> String {
        let mut out = format!(
            "{}:{}:{}: {}",
            self.file, self.line, self.column, self.message
        );
        if !self.stack.is_empty() {
            out.push_str("\n\nCall stack:");
            for frame in &self.stack {
                out.push_str(&format!(
                    "\n  at {} ({}:{}:{})",
                    frame.function_name, frame.file, frame.position.line, frame.position.column
                ));
            }
        }
        out
    }
}
