//! Configuration file loading and command-line overrides

use anyhow::{Context, bail};
use dsv_codec::{FieldCount, LineEnding, ReaderConfig, WriterConfig};
use serde::Deserialize;
use std::path::Path;
use tracing::trace;

/// Reader and writer defaults loaded from a YAML or JSON file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
}

impl Settings {
    /// Load settings, choosing the format from the file extension
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        trace!("Loading settings from file: {:?}", path);
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;

        let is_yaml = path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false);
        let settings = if is_yaml {
            serde_yaml::from_str(&content).context("YAML parse error in config file")?
        } else {
            serde_json::from_str(&content).context("JSON parse error in config file")?
        };
        Ok(settings)
    }

    /// Load settings from `path` if given, defaults otherwise
    pub fn load_optional(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Reader options given on the command line; unset ones keep the file value
#[derive(Debug, Clone, Default)]
pub struct ReaderOverrides {
    pub delimiter: Option<char>,
    pub comment: Option<char>,
    pub field_count: Option<FieldCount>,
    pub trim_leading_space: bool,
    pub lenient_quotes: bool,
}

impl ReaderOverrides {
    pub fn apply(&self, mut config: ReaderConfig) -> ReaderConfig {
        if let Some(delimiter) = self.delimiter {
            config = config.delimiter(delimiter);
        }
        if let Some(comment) = self.comment {
            config = config.comment(comment);
        }
        if let Some(field_count) = self.field_count {
            config = config.field_count(field_count);
        }
        if self.trim_leading_space {
            config = config.trim_leading_space(true);
        }
        if self.lenient_quotes {
            config = config.lenient_quotes(true);
        }
        config
    }
}

/// Writer options given on the command line
#[derive(Debug, Clone, Default)]
pub struct WriterOverrides {
    pub delimiter: Option<char>,
    pub crlf: bool,
}

impl WriterOverrides {
    pub fn apply(&self, mut config: WriterConfig) -> WriterConfig {
        if let Some(delimiter) = self.delimiter {
            config = config.delimiter(delimiter);
        }
        if self.crlf {
            config = config.line_ending(LineEnding::CRLF);
        }
        config
    }
}

/// Give the writer the reader's comment character unless it already has one
///
/// Output read back with the same dialect then keeps a first field such as
/// `#x` as data instead of skipping the line.
pub fn inherit_comment(reader: &ReaderConfig, mut writer: WriterConfig) -> WriterConfig {
    if writer.comment.is_none() {
        if let Some(comment) = reader.comment.filter(|&c| c != writer.delimiter) {
            writer = writer.comment(comment);
        }
    }
    writer
}

/// Parse a single character, accepting `\t` and `tab` for a tab
pub fn parse_char(s: &str) -> anyhow::Result<char> {
    if s == "\\t" || s.eq_ignore_ascii_case("tab") {
        return Ok('\t');
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => bail!("expected a single character, got {s:?}"),
    }
}

/// Parse `any`, `infer` or a fixed number of fields
pub fn parse_field_count(s: &str) -> anyhow::Result<FieldCount> {
    match s {
        "any" => Ok(FieldCount::Any),
        "infer" => Ok(FieldCount::InferFromFirstRecord),
        n => n
            .parse()
            .map(FieldCount::Fixed)
            .with_context(|| format!("expected 'any', 'infer' or a number, got {n:?}")),
    }
}
