//! Error types for the DSV codec with line/column context

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Whether a field-count mismatch is due to missing or extra fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCountMismatchKind {
    Missing,
    Extra,
}

impl FieldCountMismatchKind {
    /// Classify an actual count against the expected one.
    pub fn classify(expected: usize, actual: usize) -> Self {
        if actual < expected {
            Self::Missing
        } else {
            Self::Extra
        }
    }
}

impl std::fmt::Display for FieldCountMismatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing fields"),
            Self::Extra => write!(f, "extra fields"),
        }
    }
}

/// Errors that can occur when reading or writing delimited text
#[derive(Error, Debug, Clone)]
pub enum DsvError {
    /// Delimiter, quote and comment characters collide or are line breaks
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A quote appeared where it cannot start or end a quoted field
    #[error("Bare quote at line {line}, column {column}")]
    BareQuote { line: usize, column: usize },

    /// The stream ended inside a quoted field that opened here
    #[error("Unterminated quoted field starting at line {line}, column {column}")]
    UnterminatedQuote { line: usize, column: usize },

    /// Record length disagrees with the established field count
    #[error(
        "Field count mismatch at line {line}: expected {expected} fields, got {actual} ({kind})"
    )]
    FieldCountMismatch {
        line: usize,
        expected: usize,
        actual: usize,
        kind: FieldCountMismatchKind,
    },

    /// Failure from the underlying stream
    #[error("IO error: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl DsvError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Create a bare-quote error
    pub fn bare_quote(line: usize, column: usize) -> Self {
        Self::BareQuote { line, column }
    }

    /// Create an unterminated-quote error
    pub fn unterminated_quote(line: usize, column: usize) -> Self {
        Self::UnterminatedQuote { line, column }
    }

    /// Create a field-count mismatch error.
    pub fn field_count_mismatch(line: usize, expected: usize, actual: usize) -> Self {
        Self::FieldCountMismatch {
            line,
            expected,
            actual,
            kind: FieldCountMismatchKind::classify(expected, actual),
        }
    }

    /// Wrap an I/O error that occurred while reading the given line.
    pub(crate) fn invalid_data_at(line: usize, message: impl std::fmt::Display) -> Self {
        Self::from(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line {line}: {message}"),
        ))
    }

    /// Get the line number if available
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::BareQuote { line, .. }
            | Self::UnterminatedQuote { line, .. }
            | Self::FieldCountMismatch { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Get the column if available
    pub fn column(&self) -> Option<usize> {
        match self {
            Self::BareQuote { column, .. } | Self::UnterminatedQuote { column, .. } => {
                Some(*column)
            }
            _ => None,
        }
    }

    /// Whether this error came from the underlying stream
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// The wrapped I/O error, if any
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DsvError {
    fn from(e: io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}

/// Result type alias for codec operations
pub type DsvResult<T> = std::result::Result<T, DsvError>;
