//! CSV input and output plumbing shared by every utility.

use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Read, Write};
use std::path::Path;

use clap::Args;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Error, Result};

/// Options accepted by every utility.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Delimiting character of the input CSV file
    #[arg(short = 'd', long = "delimiter", global = true)]
    pub delimiter: Option<char>,

    /// Specify that the input CSV file is delimited with tabs. Overrides "-d"
    #[arg(short = 't', long = "tabs", global = true)]
    pub tabs: bool,

    /// Character used to quote strings in the input CSV file
    #[arg(short = 'q', long = "quotechar", global = true)]
    pub quotechar: Option<char>,

    /// Quoting style used in the input CSV file. 0 = minimal, 1 = all,
    /// 2 = non-numeric, 3 = none
    #[arg(short = 'u', long = "quoting", global = true,
          value_parser = clap::value_parser!(u8).range(0..=3))]
    pub quoting: Option<u8>,

    /// Whether or not double quotes are doubled in the input CSV file
    #[arg(short = 'b', long = "no-doublequote", global = true)]
    pub no_doublequote: bool,

    /// Character used to escape the delimiter if --quoting 3 is specified and
    /// quotes are not used
    #[arg(short = 'p', long = "escapechar", global = true)]
    pub escapechar: Option<char>,

    /// Maximum length of a single field in the input CSV file
    #[arg(short = 'z', long = "maxfieldsize", global = true)]
    pub max_field_size: Option<usize>,

    /// Specify the encoding of the input CSV file
    #[arg(short = 'e', long = "encoding", global = true, default_value = "utf-8")]
    pub encoding: String,

    /// Specify that the input CSV file has no header row. Will create default
    /// headers (a, b, c, ...)
    #[arg(short = 'H', long = "no-header-row", global = true)]
    pub no_header_row: bool,

    /// Specify the number of initial lines to skip before the header row
    #[arg(short = 'K', long = "skip-lines", global = true, default_value_t = 0)]
    pub skip_lines: usize,

    /// Print detailed diagnostics when an error occurs
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// When interpreting or displaying column numbers, use zero-based
    /// numbering instead of the default 1-based numbering
    #[arg(long = "zero", global = true)]
    pub zero: bool,

    /// Write records as a JSON array of objects
    #[arg(short = 'j', long = "json", global = true)]
    pub json: bool,
}

impl CommonArgs {
    /// The number of the first column: 0 with `--zero`, otherwise 1.
    pub fn column_offset(&self) -> usize {
        if self.zero { 0 } else { 1 }
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Csv
        }
    }

    /// Reader settings described by these options.
    pub fn dialect(&self) -> Result<Dialect> {
        let encoding = self.encoding.to_lowercase().replace('_', "-");
        if !matches!(encoding.as_str(), "utf-8" | "utf8" | "ascii" | "us-ascii") {
            return Err(Error::Usage(format!(
                "Unsupported encoding '{}'; input must be UTF-8",
                self.encoding
            )));
        }

        let delimiter = if self.tabs {
            b'\t'
        } else {
            ascii_byte(self.delimiter.unwrap_or(','), "delimiter")?
        };
        let quote = ascii_byte(self.quotechar.unwrap_or('"'), "quotechar")?;
        let escape = self
            .escapechar
            .map(|c| ascii_byte(c, "escapechar"))
            .transpose()?;

        Ok(Dialect {
            delimiter,
            quote,
            quoting: self.quoting != Some(3),
            double_quote: !self.no_doublequote,
            escape,
            max_field_size: self.max_field_size,
            no_header_row: self.no_header_row,
            skip_lines: self.skip_lines,
        })
    }
}

fn ascii_byte(c: char, option: &str) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| Error::Usage(format!("The {} must be a single ASCII character", option)))
}

/// How input CSV is read.
#[derive(Debug, Clone)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
    pub quoting: bool,
    pub double_quote: bool,
    pub escape: Option<u8>,
    pub max_field_size: Option<usize>,
    pub no_header_row: bool,
    pub skip_lines: usize,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            quoting: true,
            double_quote: true,
            escape: None,
            max_field_size: None,
            no_header_row: false,
            skip_lines: 0,
        }
    }
}

/// A not-yet-read input stream and the dialect to read it with.
pub struct Source {
    dialect: Dialect,
    input: Box<dyn Read>,
    interactive: bool,
}

impl Source {
    /// Open `path`, or stdin when it is absent or `-`.
    pub fn open(dialect: Dialect, path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path != Path::new("-") => Ok(Self {
                dialect,
                input: Box::new(File::open(path)?),
                interactive: false,
            }),
            _ => Ok(Self {
                dialect,
                interactive: io::stdin().is_terminal(),
                input: Box::new(io::stdin()),
            }),
        }
    }

    pub fn from_reader(dialect: Dialect, reader: impl Read + 'static) -> Self {
        Self {
            dialect,
            input: Box::new(reader),
            interactive: false,
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Skip the configured leading lines and iterate over the CSV records.
    pub fn records(self) -> Result<Rows> {
        if self.interactive {
            return Err(Error::Usage(
                "You must provide an input file or piped data.".to_string(),
            ));
        }

        let mut input = BufReader::new(self.input);
        for _ in 0..self.dialect.skip_lines {
            let mut line = Vec::new();
            if input.read_until(b'\n', &mut line)? == 0 {
                break;
            }
        }

        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.dialect.delimiter)
            .quote(self.dialect.quote)
            .quoting(self.dialect.quoting)
            .double_quote(self.dialect.double_quote)
            .escape(self.dialect.escape)
            .from_reader(Box::new(input) as Box<dyn Read>);

        let limit = self.dialect.max_field_size;
        Ok(Box::new(reader.into_records().map(move |record| {
            let record = record?;
            if let Some(limit) = limit
                && record.iter().any(|field| field.len() > limit)
            {
                return Err(Error::FieldLimit(limit));
            }
            Ok(record.iter().map(str::to_string).collect())
        })))
    }
}

/// A stream of data rows.
pub type Rows = Box<dyn Iterator<Item = Result<Vec<String>>>>;

/// Column names and the data rows that follow them.
pub struct Input {
    pub column_names: Vec<String>,
    pub rows: Rows,
}

impl Input {
    /// Split the first record off as the header, or invent letter names when
    /// the source has no header row.
    pub fn from_source(source: Source) -> Result<Self> {
        let no_header_row = source.dialect().no_header_row;
        let mut rows = source.records()?;
        let Some(first) = rows.next().transpose()? else {
            return Ok(Input::empty());
        };

        if no_header_row {
            let column_names = default_headers(first.len());
            let rows = Box::new(std::iter::once(Ok(first)).chain(rows));
            Ok(Input { column_names, rows })
        } else {
            Ok(Input {
                column_names: first,
                rows,
            })
        }
    }

    pub fn empty() -> Self {
        Input {
            column_names: Vec::new(),
            rows: Box::new(std::iter::empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.column_names.is_empty()
    }
}

/// Names for headerless input: `a` to `z`, then `aa`, `bb`, ...
pub fn default_headers(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let letter = char::from(b'a' + (i % 26) as u8);
            letter.to_string().repeat(i / 26 + 1)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Receives the header and then each output record.
pub trait RecordSink {
    fn write_header(&mut self, header: &[String]) -> Result<()>;
    fn write_record(&mut self, record: &[String]) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Where a utility writes its results.
pub struct Output<'a> {
    writer: &'a mut dyn Write,
    format: OutputFormat,
}

impl<'a> Output<'a> {
    pub fn new(writer: &'a mut dyn Write, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// A sink for records in the selected format.
    pub fn records(&mut self) -> Box<dyn RecordSink + '_> {
        match self.format {
            OutputFormat::Csv => Box::new(CsvSink {
                writer: csv::WriterBuilder::new()
                    .flexible(true)
                    .from_writer(&mut *self.writer),
            }),
            OutputFormat::Json => Box::new(JsonSink {
                writer: &mut *self.writer,
                header: Vec::new(),
                records: Vec::new(),
            }),
        }
    }

    /// The raw writer, for plain-text output.
    pub fn text(&mut self) -> &mut dyn Write {
        &mut *self.writer
    }
}

struct CsvSink<'w> {
    writer: csv::Writer<&'w mut dyn Write>,
}

impl RecordSink for CsvSink<'_> {
    fn write_header(&mut self, header: &[String]) -> Result<()> {
        self.write_record(header)
    }

    fn write_record(&mut self, record: &[String]) -> Result<()> {
        self.writer.write_record(record)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

struct JsonSink<'w> {
    writer: &'w mut dyn Write,
    header: Vec<String>,
    records: Vec<Vec<String>>,
}

impl RecordSink for JsonSink<'_> {
    fn write_header(&mut self, header: &[String]) -> Result<()> {
        self.header = header.to_vec();
        Ok(())
    }

    fn write_record(&mut self, record: &[String]) -> Result<()> {
        self.records.push(record.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let objects: Vec<JsonRecord> = self
            .records
            .iter()
            .map(|values| JsonRecord {
                header: &self.header,
                values,
            })
            .collect();
        serde_json::to_writer_pretty(&mut *self.writer, &objects).map_err(io::Error::from)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// One record as a JSON object, keys in header order.
struct JsonRecord<'a> {
    header: &'a [String],
    values: &'a [String],
}

impl Serialize for JsonRecord<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.header.len()))?;
        for (i, key) in self.header.iter().enumerate() {
            map.serialize_entry(key, self.values.get(i).map_or("", String::as_str))?;
        }
        map.end()
    }
}
