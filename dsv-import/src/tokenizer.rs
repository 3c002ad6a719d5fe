//! Splitting delimited text into records.
//!
//! The pipeline talks to a [`RecordTokenizer`]; [`CsvTokenizer`] is the
//! default implementation, backed by the `csv` crate. The first row is the
//! header. Short rows are padded with empty strings, surplus cells are
//! dropped, and a header name that repeats keeps its first position while
//! taking the later cell's value.

use std::io::Read;

use csv::{ReaderBuilder, Trim};
use encoding_rs::Encoding;

use crate::delimiter::Delimiter;
use crate::error::Result;
use crate::sources::encoding::decode_field;
use crate::table::{Record, Value};

/// Records in source order, produced lazily.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

/// What the tokenizer reads from.
pub enum TokenizerInput<'a> {
    /// Fully decoded text
    Text(&'a str),
    /// Raw bytes in an ASCII-compatible encoding, decoded field by field
    Stream {
        reader: Box<dyn Read + 'a>,
        encoding: &'static Encoding,
    },
}

/// Turns text into flat records once the delimiter is known.
pub trait RecordTokenizer: Send + Sync {
    fn records<'a>(&self, input: TokenizerInput<'a>, delimiter: Delimiter)
        -> Result<RecordIter<'a>>;
}

/// [`RecordTokenizer`] backed by the `csv` crate.
#[derive(Debug, Clone)]
pub struct CsvTokenizer {
    quote: u8,
    trim: bool,
}

impl Default for CsvTokenizer {
    fn default() -> Self {
        Self {
            quote: b'"',
            trim: false,
        }
    }
}

impl CsvTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom quote character
    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// Set whether to trim whitespace around cells
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    fn builder(&self, delimiter: Delimiter) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(delimiter.as_byte())
            .quote(self.quote)
            .has_headers(true)
            .flexible(true)
            .trim(if self.trim { Trim::All } else { Trim::None });
        builder
    }
}

impl RecordTokenizer for CsvTokenizer {
    fn records<'a>(
        &self,
        input: TokenizerInput<'a>,
        delimiter: Delimiter,
    ) -> Result<RecordIter<'a>> {
        match input {
            TokenizerInput::Text(text) => {
                let mut reader = self.builder(delimiter).from_reader(text.as_bytes());
                let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
                Ok(Box::new(reader.into_records().map(move |row| {
                    let row = row?;
                    Ok(build_record(&headers, row.iter()))
                })))
            }
            TokenizerInput::Stream { reader, encoding } => {
                let mut reader = self.builder(delimiter).from_reader(reader);
                let headers: Vec<String> = reader
                    .byte_headers()?
                    .iter()
                    .map(|h| decode_field(h, encoding).into_owned())
                    .collect();
                Ok(Box::new(reader.into_byte_records().map(move |row| {
                    let row = row?;
                    Ok(build_record(
                        &headers,
                        row.iter().map(|cell| decode_field(cell, encoding)),
                    ))
                })))
            }
        }
    }
}

fn build_record<I, S>(headers: &[String], cells: I) -> Record
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut cells = cells.into_iter();
    let mut record = Record::with_capacity(headers.len());
    for name in headers {
        let value = cells.next().map(Into::into).unwrap_or_default();
        record.insert(name.clone(), Value::String(value));
    }
    record
}
