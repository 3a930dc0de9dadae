//! # dsv-codec
//!
//! Reader and writer for delimiter-separated text records.
//!
//! Records are ordered sequences of string fields. Fields that contain the
//! delimiter, a quote or a line break are enclosed in double quotes with
//! embedded quotes doubled, so anything the writer emits reads back unchanged
//! under the same configuration.
//!
//! ## Example Usage
//!
//! ```rust
//! use dsv_codec::{DsvReader, DsvWriter, ReaderConfig, WriterConfig};
//!
//! let input = "first_name🦀last_name\n\"Rob\"🦀\"Pike\"\n# skipped\nKen🦀Thompson\n";
//! let config = ReaderConfig::new().delimiter('🦀').comment('#');
//! let records = DsvReader::new(input.as_bytes(), config)?.read_all()?;
//! assert_eq!(records[1], ["Rob", "Pike"]);
//!
//! let mut writer = DsvWriter::new(Vec::new(), WriterConfig::new().delimiter(','))?;
//! writer.write_all(&records)?;
//! let output = writer.into_inner()?;
//! assert_eq!(output, b"first_name,last_name\nRob,Pike\nKen,Thompson\n");
//! # Ok::<(), dsv_codec::DsvError>(())
//! ```

pub mod config;
pub mod errors;
pub mod quoting;
pub mod reader;
pub mod writer;

// Re-export main types
pub use config::{FieldCount, LineEnding, ReaderConfig, WriterConfig};
pub use errors::{DsvError, DsvResult, FieldCountMismatchKind};
pub use reader::{DsvReader, Position, RecordIter};
pub use writer::DsvWriter;

/// A single record: its fields in order
pub type Record = Vec<String>;
