//! Reader and writer configuration options

use crate::errors::{DsvError, DsvResult};
use crate::quoting::{QUOTE, is_valid_delimiter};
use serde::{Deserialize, Serialize};

/// How the reader enforces the number of fields per record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCount {
    /// Records may have any number of fields
    Any,
    /// The first record fixes the count for the rest of the stream (default)
    #[default]
    InferFromFirstRecord,
    /// Every record must have exactly this many fields
    Fixed(usize),
}

/// Line ending written after each record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineEnding {
    /// Unix-style line feed (\n, default)
    #[default]
    LF,
    /// Windows-style carriage return + line feed (\r\n)
    CRLF,
}

impl LineEnding {
    /// Get the line ending as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::LF => "\n",
            LineEnding::CRLF => "\r\n",
        }
    }
}

/// Configuration for reading delimited text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Field delimiter character (default: comma)
    pub delimiter: char,
    /// Lines starting with this character are skipped (default: none)
    pub comment: Option<char>,
    /// Field-count enforcement (default: inferred from the first record)
    pub field_count: FieldCount,
    /// Strip leading whitespace from each field before quote detection
    pub trim_leading_space: bool,
    /// Accept stray quotes instead of failing with a bare-quote error
    pub lenient_quotes: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            comment: None,
            field_count: FieldCount::default(),
            trim_leading_space: false,
            lenient_quotes: false,
        }
    }
}

impl ReaderConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiter character
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the comment character
    pub fn comment(mut self, comment: char) -> Self {
        self.comment = Some(comment);
        self
    }

    /// Disable comment handling
    pub fn without_comment(mut self) -> Self {
        self.comment = None;
        self
    }

    /// Set field-count enforcement
    pub fn field_count(mut self, field_count: FieldCount) -> Self {
        self.field_count = field_count;
        self
    }

    /// Configure leading-space trimming
    pub fn trim_leading_space(mut self, trim: bool) -> Self {
        self.trim_leading_space = trim;
        self
    }

    /// Configure lenient quote handling
    pub fn lenient_quotes(mut self, lenient: bool) -> Self {
        self.lenient_quotes = lenient;
        self
    }

    /// Check that delimiter, quote and comment characters are usable together
    pub fn validate(&self) -> DsvResult<()> {
        validate_delimiter(self.delimiter)?;
        if let Some(comment) = self.comment {
            if comment == QUOTE || comment == '\r' || comment == '\n' {
                return Err(DsvError::config(format!(
                    "comment character {comment:?} must not be a quote or line break"
                )));
            }
            if comment == self.delimiter {
                return Err(DsvError::config(format!(
                    "comment character {comment:?} must differ from the delimiter"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for writing delimited text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Field delimiter character (default: comma)
    pub delimiter: char,
    /// Record terminator (default: LF)
    pub line_ending: LineEnding,
    /// Comment character of the intended reader; a first field starting with
    /// it is quoted so the record is not skipped (default: none)
    pub comment: Option<char>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            line_ending: LineEnding::default(),
            comment: None,
        }
    }
}

impl WriterConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiter character
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set line ending
    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set the comment character of the reader the output is meant for
    pub fn comment(mut self, comment: char) -> Self {
        self.comment = Some(comment);
        self
    }

    /// Check that the delimiter is usable
    pub fn validate(&self) -> DsvResult<()> {
        validate_delimiter(self.delimiter)?;
        if self.comment == Some(self.delimiter) {
            return Err(DsvError::config(format!(
                "comment character {:?} must differ from the delimiter",
                self.delimiter
            )));
        }
        Ok(())
    }
}

fn validate_delimiter(delimiter: char) -> DsvResult<()> {
    if is_valid_delimiter(delimiter) {
        Ok(())
    } else {
        Err(DsvError::config(format!(
            "delimiter {delimiter:?} must not be a quote, line break or replacement character"
        )))
    }
}
