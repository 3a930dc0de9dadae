//! Buffered writer for delimited text

use crate::config::WriterConfig;
use crate::errors::{DsvError, DsvResult};
use crate::quoting::encode_field;
use std::io::{BufWriter, Write};
use tracing::{debug, trace};

/// Writer for delimited text bound to a single output stream
///
/// Records are encoded into an internal buffer; call [`DsvWriter::flush`] to
/// push them to the stream. The first failure is kept: every later call
/// returns it again and nothing more is written.
pub struct DsvWriter<W: Write> {
    inner: BufWriter<W>,
    config: WriterConfig,
    error: Option<DsvError>,
    line: String,
    records_written: u64,
}

impl<W: Write> DsvWriter<W> {
    /// Create a writer over `inner`, validating the configuration
    pub fn new(inner: W, config: WriterConfig) -> DsvResult<Self> {
        config.validate()?;
        Ok(Self::build(inner, config))
    }

    /// Create a writer with the default configuration
    pub fn from_writer(inner: W) -> Self {
        Self::build(inner, WriterConfig::default())
    }

    fn build(inner: W, config: WriterConfig) -> Self {
        Self {
            inner: BufWriter::new(inner),
            config,
            error: None,
            line: String::new(),
            records_written: 0,
        }
    }

    /// Encode one record into the buffer
    ///
    /// A record with no fields is written as a bare line terminator, which
    /// reads back as a single empty field. It is the one record shape that
    /// does not survive a round trip.
    pub fn write_record<I, T>(&mut self, record: I) -> DsvResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.check()?;

        let fields: Vec<T> = record.into_iter().collect();
        self.line.clear();
        for (i, field) in fields.iter().enumerate() {
            let field = field.as_ref();
            if i > 0 {
                self.line.push(self.config.delimiter);
            }
            let sole_empty = fields.len() == 1 && field.is_empty();
            let commented = i == 0
                && self
                    .config
                    .comment
                    .is_some_and(|comment| field.starts_with(comment));
            encode_field(field, self.config.delimiter, sole_empty || commented, &mut self.line);
        }
        self.line.push_str(self.config.line_ending.as_str());

        let result = self.inner.write_all(self.line.as_bytes());
        self.record(result)?;
        self.records_written += 1;
        trace!(fields = fields.len(), "Wrote record");
        Ok(())
    }

    /// Push buffered output to the underlying stream
    pub fn flush(&mut self) -> DsvResult<()> {
        self.check()?;
        let result = self.inner.flush();
        self.record(result)
    }

    /// Write every record, then flush once
    ///
    /// Stops at the first error.
    pub fn write_all<I, R, T>(&mut self, records: I) -> DsvResult<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut count = 0usize;
        for record in records {
            self.write_record(record)?;
            count += 1;
        }
        self.flush()?;
        debug!(record_count = count, "Finished writing records");
        Ok(())
    }

    /// The first error encountered by a write or flush, if any
    pub fn last_error(&self) -> Option<&DsvError> {
        self.error.as_ref()
    }

    /// Number of records accepted into the buffer
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Get the writer configuration
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Get a reference to the underlying stream
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// Flush and unwrap the underlying stream
    pub fn into_inner(mut self) -> DsvResult<W> {
        self.flush()?;
        self.inner
            .into_inner()
            .map_err(|e| DsvError::from(e.into_error()))
    }

    fn check(&self) -> DsvResult<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn record(&mut self, result: std::io::Result<()>) -> DsvResult<()> {
        result.map_err(|e| {
            let err = DsvError::from(e);
            debug!(error = %err, "Writer failed; further writes are refused");
            self.error = Some(err.clone());
            err
        })
    }
}
