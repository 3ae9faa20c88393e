//! Validation error types
//!
//! Position-tagged findings produced while decoding and validating a
//! document, and the ordered result that aggregates them.

use std::fmt;

/// A line/column pair in the source document (1-based).
///
/// Objects built in code rather than decoded carry `Position::default()`
/// (0:0) and therefore sort ahead of every positioned finding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single validation finding with the position of the offending node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, at: Position) -> Self {
        Self {
            message: message.into(),
            line: at.line,
            column: at.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Sort findings by (line, column); stable, so findings on the same node keep
/// the order they were discovered in.
pub fn sort_errors(errors: &mut [ValidationError]) {
    errors.sort_by_key(|e| (e.line, e.column));
}

/// Result of validating a document
#[derive(Debug, Default, Clone)]
pub struct ValidationResult {
    pub file_path: String,
    pub workflow_count: usize,
    pub step_count: usize,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.errors.extend(errors);
    }

    pub fn sort(&mut self) {
        sort_errors(&mut self.errors);
    }
}
