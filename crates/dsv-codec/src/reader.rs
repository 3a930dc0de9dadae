//! Streaming reader for delimited text
//!
//! The reader pulls one physical line at a time from a [`BufRead`] and runs a
//! small state machine over it. A quoted field may continue onto following
//! lines; everything between its quotes, line breaks included, is kept
//! verbatim.

use crate::config::{FieldCount, ReaderConfig};
use crate::errors::{DsvError, DsvResult};
use crate::quoting::QUOTE;
use std::io::BufRead;
use tracing::{debug, trace};

/// Location of a field within the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Physical line (1-indexed)
    pub line: usize,
    /// Character column within the line (1-indexed)
    pub column: usize,
    /// Byte offset from the start of the input
    pub byte: u64,
}

/// One physical line, terminator included
struct Line {
    text: String,
    number: usize,
    offset: u64,
}

/// Scanning state over the current physical line
struct Cursor {
    line: Line,
    pos: usize,
    column: usize,
}

impl Cursor {
    fn new(line: Line) -> Self {
        Self {
            line,
            pos: 0,
            column: 1,
        }
    }

    fn rest(&self) -> &str {
        &self.line.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        self.column += 1;
        Some(c)
    }

    fn skip_bytes(&mut self, n: usize) {
        self.column += self.rest()[..n].chars().count();
        self.pos += n;
    }

    /// The remainder is only a line terminator (or a lone `\r` before end of input)
    fn at_terminator(&self) -> bool {
        matches!(self.rest(), "" | "\n" | "\r\n" | "\r")
    }

    fn skip_leading_space(&mut self, delimiter: char) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() || c == delimiter || self.at_terminator() {
                break;
            }
            self.bump();
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line.number,
            column: self.column,
            byte: self.line.offset + self.pos as u64,
        }
    }
}

/// Reader for delimited text bound to a single input stream
pub struct DsvReader<R> {
    inner: R,
    config: ReaderConfig,
    /// Physical lines consumed so far
    line: usize,
    /// Bytes consumed so far
    offset: u64,
    expected_fields: Option<usize>,
    field_positions: Vec<Position>,
    records_read: u64,
}

impl<R: BufRead> DsvReader<R> {
    /// Create a reader over `inner`, validating the configuration
    pub fn new(inner: R, config: ReaderConfig) -> DsvResult<Self> {
        config.validate()?;
        let expected_fields = match config.field_count {
            FieldCount::Fixed(n) => Some(n),
            FieldCount::Any | FieldCount::InferFromFirstRecord => None,
        };
        Ok(Self {
            inner,
            config,
            line: 0,
            offset: 0,
            expected_fields,
            field_positions: Vec::new(),
            records_read: 0,
        })
    }

    /// Create a reader with the default configuration
    pub fn from_reader(inner: R) -> Self {
        Self {
            inner,
            config: ReaderConfig::default(),
            line: 0,
            offset: 0,
            expected_fields: None,
            field_positions: Vec::new(),
            records_read: 0,
        }
    }

    /// Read the next record, or `None` at end of input
    ///
    /// After an error the reader's position is unspecified and reading should
    /// stop.
    pub fn read_record(&mut self) -> DsvResult<Option<Vec<String>>> {
        let line = loop {
            match self.next_line()? {
                None => {
                    debug!(
                        records = self.records_read,
                        lines = self.line,
                        "Reached end of input"
                    );
                    return Ok(None);
                }
                Some(line) if self.is_comment(&line) => {
                    trace!(line = line.number, "Skipped comment line");
                }
                Some(line) => break line,
            }
        };

        let record_line = line.number;
        let mut cursor = Cursor::new(line);
        let mut record = Vec::with_capacity(self.expected_fields.unwrap_or_default());
        self.field_positions.clear();

        loop {
            if self.config.trim_leading_space {
                cursor.skip_leading_space(self.config.delimiter);
            }
            self.field_positions.push(cursor.position());

            let (field, more) = if cursor.peek() == Some(QUOTE) {
                self.read_quoted(&mut cursor)?
            } else {
                self.read_unquoted(&mut cursor)?
            };
            record.push(field);

            if !more {
                break;
            }
        }

        self.check_field_count(record_line, record.len())?;
        self.records_read += 1;
        trace!(line = record_line, fields = record.len(), "Read record");
        Ok(Some(record))
    }

    /// Read every remaining record
    ///
    /// Stops at the first error; records read before it are discarded.
    pub fn read_all(&mut self) -> DsvResult<Vec<Vec<String>>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        debug!(record_count = records.len(), "Finished reading records");
        Ok(records)
    }

    /// Iterate over the remaining records
    pub fn records(&mut self) -> RecordIter<'_, R> {
        RecordIter {
            reader: self,
            done: false,
        }
    }

    /// Where field `index` of the most recently read record started
    pub fn field_position(&self, index: usize) -> Option<Position> {
        self.field_positions.get(index).copied()
    }

    /// Number of physical lines consumed so far
    pub fn line(&self) -> usize {
        self.line
    }

    /// Number of bytes consumed so far
    pub fn input_offset(&self) -> u64 {
        self.offset
    }

    /// Number of records successfully read
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// The enforced field count, once known
    pub fn expected_fields(&self) -> Option<usize> {
        self.expected_fields
    }

    /// Get the reader configuration
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Get a reference to the underlying stream
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_line(&mut self) -> DsvResult<Option<Line>> {
        let mut raw = Vec::new();
        let n = self.inner.read_until(b'\n', &mut raw)?;
        if n == 0 {
            return Ok(None);
        }

        self.line += 1;
        let offset = self.offset;
        self.offset += n as u64;

        let text = String::from_utf8(raw).map_err(|e| DsvError::invalid_data_at(self.line, e))?;
        Ok(Some(Line {
            text,
            number: self.line,
            offset,
        }))
    }

    fn is_comment(&self, line: &Line) -> bool {
        self.config
            .comment
            .is_some_and(|comment| line.text.starts_with(comment))
    }

    /// Scan an unquoted field; the flag tells whether a delimiter followed it
    fn read_unquoted(&self, cursor: &mut Cursor) -> DsvResult<(String, bool)> {
        let mut field = String::new();
        let more = self.scan_unquoted(cursor, &mut field)?;
        Ok((field, more))
    }

    /// Append unquoted text to `field` up to the next delimiter or line end
    fn scan_unquoted(&self, cursor: &mut Cursor, field: &mut String) -> DsvResult<bool> {
        let start = cursor.pos;
        loop {
            if cursor.at_terminator() {
                field.push_str(&cursor.line.text[start..cursor.pos]);
                return Ok(false);
            }

            let column = cursor.column;
            match cursor.bump() {
                Some(c) if c == self.config.delimiter => {
                    let end = cursor.pos - c.len_utf8();
                    field.push_str(&cursor.line.text[start..end]);
                    return Ok(true);
                }
                Some(QUOTE) if !self.config.lenient_quotes => {
                    return Err(DsvError::bare_quote(cursor.line.number, column));
                }
                Some(_) => {}
                None => {
                    field.push_str(&cursor.line.text[start..]);
                    return Ok(false);
                }
            }
        }
    }

    /// Scan a quoted field, pulling more lines while the quote stays open
    fn read_quoted(&mut self, cursor: &mut Cursor) -> DsvResult<(String, bool)> {
        let open = cursor.position();
        cursor.bump();

        let mut field = String::new();
        loop {
            let rest = cursor.rest();
            match rest.find(QUOTE) {
                Some(i) => {
                    field.push_str(&rest[..i]);
                    cursor.skip_bytes(i);
                    let quote_column = cursor.column;
                    cursor.bump();

                    match cursor.peek() {
                        Some(QUOTE) => {
                            field.push(QUOTE);
                            cursor.bump();
                        }
                        Some(c) if c == self.config.delimiter => {
                            cursor.bump();
                            return Ok((field, true));
                        }
                        _ if cursor.at_terminator() => return Ok((field, false)),
                        _ if self.config.lenient_quotes => {
                            field.push(QUOTE);
                            let more = self.scan_unquoted(cursor, &mut field)?;
                            return Ok((field, more));
                        }
                        _ => {
                            return Err(DsvError::bare_quote(cursor.line.number, quote_column));
                        }
                    }
                }
                None => {
                    field.push_str(rest);
                    match self.next_line()? {
                        Some(line) => *cursor = Cursor::new(line),
                        None => return Err(DsvError::unterminated_quote(open.line, open.column)),
                    }
                }
            }
        }
    }

    fn check_field_count(&mut self, line: usize, actual: usize) -> DsvResult<()> {
        match self.expected_fields {
            Some(expected) if expected != actual => {
                Err(DsvError::field_count_mismatch(line, expected, actual))
            }
            Some(_) => Ok(()),
            None => {
                if self.config.field_count == FieldCount::InferFromFirstRecord {
                    debug!(fields = actual, line, "Inferred field count from first record");
                    self.expected_fields = Some(actual);
                }
                Ok(())
            }
        }
    }
}

/// Iterator over the records of a [`DsvReader`]
///
/// Yields each record or the first error, then stops.
pub struct RecordIter<'r, R> {
    reader: &'r mut DsvReader<R>,
    done: bool,
}

impl<R: BufRead> Iterator for RecordIter<'_, R> {
    type Item = DsvResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: BufRead> std::iter::FusedIterator for RecordIter<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FieldCountMismatchKind;

    fn read_with(input: &str, config: ReaderConfig) -> DsvResult<Vec<Vec<String>>> {
        DsvReader::new(input.as_bytes(), config)?.read_all()
    }

    fn read(input: &str) -> Vec<Vec<String>> {
        read_with(input, ReaderConfig::new().field_count(FieldCount::Any)).unwrap()
    }

    fn rec(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_read_simple() {
        assert_eq!(
            read("name,age\nJohn,30\nJane,25\n"),
            vec![rec(&["name", "age"]), rec(&["John", "30"]), rec(&["Jane", "25"])]
        );
    }

    #[test]
    fn test_read_without_final_newline() {
        assert_eq!(read("a,b\nc,d"), vec![rec(&["a", "b"]), rec(&["c", "d"])]);
    }

    #[test]
    fn test_read_crlf() {
        assert_eq!(
            read("a,b\r\nc,d\r\n"),
            vec![rec(&["a", "b"]), rec(&["c", "d"])]
        );
        assert_eq!(read("a,b\r"), vec![rec(&["a", "b"])]);
    }

    #[test]
    fn test_read_quoted_fields() {
        let input = "\"a,b\",\"say \"\"hi\"\"\",\"multi\nline\"\nx,y,z\n";
        let mut reader = DsvReader::from_reader(input.as_bytes());

        let first = reader.read_record().unwrap().unwrap();
        assert_eq!(first, rec(&["a,b", "say \"hi\"", "multi\nline"]));
        assert_eq!(reader.line(), 2);

        let second = reader.read_record().unwrap().unwrap();
        assert_eq!(second, rec(&["x", "y", "z"]));
        assert_eq!(
            reader.field_position(2),
            Some(Position {
                line: 3,
                column: 5,
                byte: 36
            })
        );
        assert_eq!(reader.read_record().unwrap(), None);
    }

    #[test]
    fn test_quoted_carriage_return_is_kept() {
        assert_eq!(read("\"a\r\nb\",c\r\n"), vec![rec(&["a\r\nb", "c"])]);
        assert_eq!(read("a\rb,c\n"), vec![rec(&["a\rb", "c"])]);
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(read(",,\n"), vec![rec(&["", "", ""])]);
        assert_eq!(read("a,\"\",c\n"), vec![rec(&["a", "", "c"])]);
        assert_eq!(read("\"\"\n"), vec![rec(&[""])]);
    }

    #[test]
    fn test_empty_line_mid_stream() {
        assert_eq!(
            read("a\n\nb\n"),
            vec![rec(&["a"]), rec(&[""]), rec(&["b"])]
        );
        assert_eq!(read("a\r\n\r\nb\r\n"), vec![rec(&["a"]), rec(&[""]), rec(&["b"])]);
    }

    #[test]
    fn test_empty_line_at_end_of_stream() {
        assert_eq!(read("a\n\n"), vec![rec(&["a"]), rec(&[""])]);
        assert_eq!(read("a\n"), vec![rec(&["a"])]);
        assert_eq!(read("\n"), vec![rec(&[""])]);
        assert!(read("").is_empty());
    }

    #[test]
    fn test_bare_quote_in_unquoted_field() {
        let err = read_with("ab\"c,d\n", ReaderConfig::new()).unwrap_err();
        assert!(matches!(err, DsvError::BareQuote { line: 1, column: 3 }));
    }

    #[test]
    fn test_text_after_closing_quote() {
        let err = read_with("x,y\n\"ab\"c,d\n", ReaderConfig::new()).unwrap_err();
        assert!(matches!(err, DsvError::BareQuote { line: 2, column: 4 }));
    }

    #[test]
    fn test_lenient_quotes() {
        let config = ReaderConfig::new().lenient_quotes(true);
        assert_eq!(
            read_with("\"ab\"c,d\n", config.clone()).unwrap(),
            vec![rec(&["ab\"c", "d"])]
        );
        assert_eq!(
            read_with("ab\"c,d\n", config).unwrap(),
            vec![rec(&["ab\"c", "d"])]
        );
    }

    #[test]
    fn test_lenient_text_after_closing_quote_ends_at_delimiter() {
        let config = ReaderConfig::new().lenient_quotes(true);
        assert_eq!(
            read_with("\"ab\"c,d\ne,f\n", config.clone()).unwrap(),
            vec![rec(&["ab\"c", "d"]), rec(&["e", "f"])]
        );
        assert_eq!(
            read_with("x,\"ab\"c\ny,z\n", config.clone()).unwrap(),
            vec![rec(&["x", "ab\"c"]), rec(&["y", "z"])]
        );
        assert_eq!(
            read_with("\"ab\"c\r\n", config.clone()).unwrap(),
            vec![rec(&["ab\"c"])]
        );
        assert_eq!(
            read_with("\"a\"b\"c,d", config).unwrap(),
            vec![rec(&["a\"b\"c", "d"])]
        );
    }

    #[test]
    fn test_lenient_stray_quote_on_later_line() {
        let config = ReaderConfig::new().lenient_quotes(true);
        let mut reader = DsvReader::new("a,b\nc\"d,e\nf,g\n".as_bytes(), config).unwrap();

        assert_eq!(
            reader.read_all().unwrap(),
            vec![rec(&["a", "b"]), rec(&["c\"d", "e"]), rec(&["f", "g"])]
        );
        assert_eq!(reader.line(), 3);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = read_with("a,b\n\"abc,d\nmore\n", ReaderConfig::new()).unwrap_err();
        assert!(matches!(
            err,
            DsvError::UnterminatedQuote { line: 2, column: 1 }
        ));

        let lenient = ReaderConfig::new().lenient_quotes(true);
        assert!(matches!(
            read_with("x,\"open", lenient).unwrap_err(),
            DsvError::UnterminatedQuote { line: 1, column: 3 }
        ));
    }

    #[test]
    fn test_fixed_field_count() {
        let config = ReaderConfig::new().field_count(FieldCount::Fixed(2));
        let mut reader = DsvReader::new("a,b\nc\n".as_bytes(), config).unwrap();

        assert_eq!(reader.expected_fields(), Some(2));
        assert_eq!(reader.read_record().unwrap(), Some(rec(&["a", "b"])));

        let err = reader.read_record().unwrap_err();
        assert!(matches!(
            err,
            DsvError::FieldCountMismatch {
                line: 2,
                expected: 2,
                actual: 1,
                kind: FieldCountMismatchKind::Missing,
            }
        ));
    }

    #[test]
    fn test_inferred_field_count() {
        let mut reader = DsvReader::from_reader("a,b\nc,d\ne,f,g\n".as_bytes());
        assert_eq!(reader.expected_fields(), None);

        reader.read_record().unwrap();
        assert_eq!(reader.expected_fields(), Some(2));
        reader.read_record().unwrap();

        let err = reader.read_record().unwrap_err();
        assert!(matches!(
            err,
            DsvError::FieldCountMismatch {
                line: 3,
                expected: 2,
                actual: 3,
                kind: FieldCountMismatchKind::Extra,
            }
        ));
    }

    #[test]
    fn test_any_field_count() {
        assert_eq!(
            read("a\nb,c\nd,e,f\n"),
            vec![rec(&["a"]), rec(&["b", "c"]), rec(&["d", "e", "f"])]
        );
    }

    #[test]
    fn test_mismatch_reports_first_line_of_record() {
        let err = read_with("a,b\n\"x\ny\",z,w\n", ReaderConfig::new()).unwrap_err();
        assert_eq!(err.line_number(), Some(2));
    }

    #[test]
    fn test_comment_lines() {
        let config = ReaderConfig::new().comment('#');
        let input = "#header comment\na,b\n#x,y,z\nc,d\n";
        let mut reader = DsvReader::new(input.as_bytes(), config.clone()).unwrap();

        assert_eq!(
            reader.read_all().unwrap(),
            vec![rec(&["a", "b"]), rec(&["c", "d"])]
        );
        assert_eq!(reader.expected_fields(), Some(2));

        assert_eq!(
            read_with("a,#b\n", config.clone()).unwrap(),
            vec![rec(&["a", "#b"])]
        );
        assert_eq!(
            read_with("\"a\n#b\",c\n", config).unwrap(),
            vec![rec(&["a\n#b", "c"])]
        );
    }

    #[test]
    fn test_trim_leading_space() {
        let config = ReaderConfig::new().trim_leading_space(true);
        assert_eq!(
            read_with("  a,   \"b,c\"\n", config).unwrap(),
            vec![rec(&["a", "b,c"])]
        );

        let tabs = ReaderConfig::new().delimiter('\t').trim_leading_space(true);
        assert_eq!(
            read_with("a\t  b\t\t\n", tabs).unwrap(),
            vec![rec(&["a", "b", "", ""])]
        );
    }

    #[test]
    fn test_multibyte_delimiter() {
        let config = ReaderConfig::new().delimiter('🦀');
        assert_eq!(
            read_with("\"Rob\"🦀\"Pike\"🦀rob\n", config).unwrap(),
            vec![rec(&["Rob", "Pike", "rob"])]
        );
    }

    #[test]
    fn test_invalid_utf8_is_io_error() {
        let mut reader = DsvReader::from_reader(&b"a,b\nc,\xff\n"[..]);
        reader.read_record().unwrap();

        let err = reader.read_record().unwrap_err();
        assert!(err.is_io());
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ReaderConfig::new().delimiter(',').comment(',');
        assert!(matches!(
            DsvReader::new("".as_bytes(), config),
            Err(DsvError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_records_iterator_stops_after_error() {
        let mut reader = DsvReader::from_reader("a,b\nc\nd,e\n".as_bytes());
        let results: Vec<_> = reader.records().collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_offsets_and_counters() {
        let mut reader = DsvReader::from_reader("ab,c\nd,e\n".as_bytes());
        reader.read_record().unwrap();
        assert_eq!(reader.input_offset(), 5);
        assert_eq!(reader.line(), 1);

        reader.read_record().unwrap();
        assert_eq!(reader.read_record().unwrap(), None);
        assert_eq!(reader.input_offset(), 9);
        assert_eq!(reader.records_read(), 2);
        assert_eq!(reader.field_position(1).map(|p| p.column), Some(3));
    }
}
