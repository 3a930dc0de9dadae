//! Field quoting policy shared by the reader and the writer
//!
//! The writer decides with [`must_quote`] whether a field needs enclosing and
//! [`escape`] performs the enclosing. The reader recognizes quoted fields by
//! the same [`QUOTE`] character, which is what makes writer output re-parsable.

/// The quote character used to enclose fields
pub const QUOTE: char = '"';

/// Field that PostgreSQL treats as end-of-data in `COPY` text
const END_OF_DATA_MARKER: &str = "\\.";

/// Check if a character can be used as a field delimiter
pub fn is_valid_delimiter(c: char) -> bool {
    c != QUOTE && c != '\r' && c != '\n' && c != char::REPLACEMENT_CHARACTER
}

/// Check if a field must be quote-enclosed to survive a round trip
///
/// A field is quoted when it contains the delimiter, a quote or a line break,
/// when it starts with whitespace (a trimming reader would drop it), or when it
/// is the `\.` end-of-data marker. An empty field needs no quotes here; the
/// record-level rule for a sole empty field lives in [`encode_field`].
pub fn must_quote(field: &str, delimiter: char) -> bool {
    if field.is_empty() {
        return false;
    }
    if field == END_OF_DATA_MARKER {
        return true;
    }
    if field
        .chars()
        .any(|c| c == delimiter || c == QUOTE || c == '\r' || c == '\n')
    {
        return true;
    }
    field.chars().next().is_some_and(char::is_whitespace)
}

/// Enclose a field in quotes, doubling every embedded quote
pub fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 2);
    push_escaped(field, &mut out);
    out
}

/// Append a field to `out`, quoting it if needed
///
/// `force` quotes the field regardless of its content. The writer sets it for
/// a record's only field when that field is empty (so the line is not a blank
/// one) and for a first field that starts with the reader's comment character.
pub fn encode_field(field: &str, delimiter: char, force: bool, out: &mut String) {
    if force || must_quote(field, delimiter) {
        push_escaped(field, out);
    } else {
        out.push_str(field);
    }
}

fn push_escaped(field: &str, out: &mut String) {
    out.push(QUOTE);
    for c in field.chars() {
        if c == QUOTE {
            out.push(QUOTE);
        }
        out.push(c);
    }
    out.push(QUOTE);
}
