//! # dsv-cli
//!
//! Command-line front end for the DSV codec.
//!
//! Reads delimited text into JSON, writes JSON records as delimited text, and
//! converts between delimiter dialects.

mod settings;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dsv_codec::{DsvReader, DsvWriter, FieldCount, Record};
use settings::{
    ReaderOverrides, Settings, WriterOverrides, inherit_comment, parse_char, parse_field_count,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dsv")]
#[command(about = "Read, write and convert delimiter-separated text")]
#[command(version)]
struct Cli {
    /// Path to a YAML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Reader options shared by commands that parse delimited text
#[derive(Args, Debug, Clone, Default)]
struct ReaderArgs {
    /// Skip lines that start with this character
    #[arg(long, value_parser = parse_char)]
    comment: Option<char>,

    /// Field-count enforcement: any, infer, or a fixed number
    #[arg(long, value_parser = parse_field_count)]
    fields: Option<FieldCount>,

    /// Ignore leading whitespace in fields
    #[arg(long)]
    trim: bool,

    /// Accept stray quotes instead of failing
    #[arg(long)]
    lenient: bool,
}

impl ReaderArgs {
    fn overrides(&self, delimiter: Option<char>) -> ReaderOverrides {
        ReaderOverrides {
            delimiter,
            comment: self.comment,
            field_count: self.fields,
            trim_leading_space: self.trim,
            lenient_quotes: self.lenient,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse delimited text and print each record as a JSON array
    Read {
        /// Input file path, or - for stdin
        input: PathBuf,

        /// Field delimiter
        #[arg(short, long, value_parser = parse_char)]
        delimiter: Option<char>,

        /// Collect every record first and print a single JSON document
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        reader: ReaderArgs,
    },

    /// Write a JSON array of string arrays as delimited text
    Write {
        /// Input JSON file path, or - for stdin
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field delimiter
        #[arg(short, long, value_parser = parse_char)]
        delimiter: Option<char>,

        /// Terminate records with CRLF instead of LF
        #[arg(long)]
        crlf: bool,
    },

    /// Re-encode delimited text with a different delimiter or line ending
    Convert {
        /// Input file path, or - for stdin
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delimiter of the input
        #[arg(long, value_parser = parse_char)]
        from_delimiter: Option<char>,

        /// Delimiter of the output
        #[arg(long, value_parser = parse_char)]
        to_delimiter: Option<char>,

        /// Terminate records with CRLF instead of LF
        #[arg(long)]
        crlf: bool,

        #[command(flatten)]
        reader: ReaderArgs,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load_optional(cli.config.as_deref())?;

    match cli.command {
        Commands::Read {
            input,
            delimiter,
            all,
            reader,
        } => {
            let config = reader.overrides(delimiter).apply(settings.reader);
            tracing::info!("Reading {}", input.display());
            read_command(&input, config, all)
        }
        Commands::Write {
            input,
            output,
            delimiter,
            crlf,
        } => {
            let config = WriterOverrides { delimiter, crlf }.apply(settings.writer);
            tracing::info!("Writing {} -> {}", input.display(), describe(output.as_deref()));
            write_command(&input, output.as_deref(), config)
        }
        Commands::Convert {
            input,
            output,
            from_delimiter,
            to_delimiter,
            crlf,
            reader,
        } => {
            let reader_config = reader.overrides(from_delimiter).apply(settings.reader);
            let writer_config = WriterOverrides {
                delimiter: to_delimiter,
                crlf,
            }
            .apply(settings.writer);
            let writer_config = inherit_comment(&reader_config, writer_config);
            tracing::info!(
                "Converting {} -> {}",
                input.display(),
                describe(output.as_deref())
            );
            convert_command(&input, output.as_deref(), reader_config, writer_config)
        }
    }
}

fn read_command(input: &Path, config: dsv_codec::ReaderConfig, all: bool) -> anyhow::Result<()> {
    let mut reader =
        DsvReader::new(open_input(input)?, config).context("invalid reader configuration")?;
    let mut out = BufWriter::new(io::stdout().lock());

    if all {
        let records = reader
            .read_all()
            .with_context(|| format!("failed to read '{}'", input.display()))?;
        serde_json::to_writer(&mut out, &records)?;
        writeln!(out)?;
    } else {
        while let Some(record) = reader
            .read_record()
            .with_context(|| format!("failed to read '{}'", input.display()))?
        {
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    tracing::info!(records = reader.records_read(), "Finished reading");
    Ok(())
}

fn write_command(
    input: &Path,
    output: Option<&Path>,
    config: dsv_codec::WriterConfig,
) -> anyhow::Result<()> {
    let records: Vec<Record> = serde_json::from_reader(open_input(input)?)
        .with_context(|| format!("'{}' is not a JSON array of string arrays", input.display()))?;

    let mut writer =
        DsvWriter::new(open_output(output)?, config).context("invalid writer configuration")?;
    writer
        .write_all(&records)
        .with_context(|| format!("failed to write {}", describe(output)))?;

    tracing::info!(records = writer.records_written(), "Finished writing");
    Ok(())
}

fn convert_command(
    input: &Path,
    output: Option<&Path>,
    reader_config: dsv_codec::ReaderConfig,
    writer_config: dsv_codec::WriterConfig,
) -> anyhow::Result<()> {
    let mut reader =
        DsvReader::new(open_input(input)?, reader_config).context("invalid reader configuration")?;
    let mut writer = DsvWriter::new(open_output(output)?, writer_config)
        .context("invalid writer configuration")?;

    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read '{}'", input.display()))?;
        writer
            .write_record(&record)
            .with_context(|| format!("failed to write {}", describe(output)))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", describe(output)))?;

    tracing::info!(
        records = writer.records_written(),
        lines = reader.line(),
        "Finished converting"
    );
    Ok(())
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file =
        File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create '{}'", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

fn describe(output: Option<&Path>) -> String {
    match output {
        Some(path) => format!("'{}'", path.display()),
        None => "stdout".to_string(),
    }
}
