//! The import pipeline.
//!
//! [`Importer::import`] runs, in order: encoding resolution, source
//! classification, delimiter sniffing, tokenizing, per-record filtering,
//! type inference and field-name cleanup. Any fatal error aborts the whole
//! import; warnings go to the configured [`DiagnosticSink`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::delimiter::guess_delimiter;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::Result;
use crate::filter::{ExpressionCompiler, FilterContext, ImportFilter, RecordFilterCompiler};
use crate::inference::TypeInferencer;
use crate::logging::truncate_field;
use crate::options::{ImportConfig, ImportOptions};
use crate::sanitize::is_invalid_field_name;
use crate::sources::{resolve_encoding, Content, Source, SourceReader};
use crate::table::{DataTable, Dataset, Record};
use crate::tokenizer::{CsvTokenizer, RecordIter, RecordTokenizer, TokenizerInput};
use crate::{log_data_op, log_field, perf_debug};

/// Imports delimited text into a [`Dataset`].
///
/// # Examples
///
/// ```rust
/// use dsv_import::prelude::*;
///
/// # fn main() -> dsv_import::error::Result<()> {
/// let dataset = Importer::new().import(
///     Source::text("name|pop\nEly|4,255\nBaker|68"),
///     &ImportOptions::new(),
/// )?;
/// assert_eq!(dataset.info.input_delimiter, Delimiter::Pipe);
/// assert_eq!(dataset.table().records()[0]["pop"], Value::Number(4255.0));
/// # Ok(())
/// # }
/// ```
pub struct Importer {
    config: ImportConfig,
    tokenizer: Arc<dyn RecordTokenizer>,
    compiler: Arc<dyn RecordFilterCompiler>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for Importer {
    fn default() -> Self {
        Self {
            config: ImportConfig::default(),
            tokenizer: Arc::new(CsvTokenizer::new()),
            compiler: Arc::new(ExpressionCompiler),
            sink: Arc::new(TracingSink),
        }
    }
}

impl Importer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: impl RecordTokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    pub fn with_filter_compiler(mut self, compiler: impl RecordFilterCompiler + 'static) -> Self {
        self.compiler = Arc::new(compiler);
        self
    }

    /// Sends diagnostics to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Runs the full pipeline on one source.
    #[instrument(skip(self, source, options), fields(source = %source.describe()))]
    pub fn import(&self, source: Source, options: &ImportOptions) -> Result<Dataset> {
        let encoding = resolve_encoding(options.encoding.as_deref())?;
        let filter = ImportFilter::from_options(options, self.compiler.as_ref())?;
        if let Some(expression) = options.csv_filter.as_deref() {
            perf_debug!(
                self.config.log,
                expression = %truncate_field(expression, self.config.log.max_field_length),
                "Compiled record filter"
            );
        }

        let content = SourceReader::new(&self.config).open(source, encoding)?;
        let (delimiter, records) = match content {
            Content::Buffered(text) => {
                let delimiter = guess_delimiter(&text);
                let rows = self
                    .tokenizer
                    .records(TokenizerInput::Text(&text), delimiter)?;
                (delimiter, self.collect(rows, filter.as_ref())?)
            }
            Content::Incremental(source) => {
                let delimiter = guess_delimiter(&source.sample());
                let input = TokenizerInput::Stream {
                    encoding: source.encoding(),
                    reader: source.into_reader(),
                };
                let rows = self.tokenizer.records(input, delimiter)?;
                (delimiter, self.collect(rows, filter.as_ref())?)
            }
        };
        perf_debug!(
            self.config.log,
            delimiter = %delimiter,
            records = records.len(),
            "Tokenized records"
        );

        if records.is_empty() {
            self.sink.report(Diagnostic::EmptyResult);
        }
        let table = self.finish(DataTable::new(records), options);

        log_data_op!(
            self.config.log,
            delimiter = %delimiter,
            records = table.len(),
            fields = table.field_names().len(),
            "Imported delimited text"
        );
        Ok(Dataset::single(table, delimiter))
    }

    /// Filters and gathers tokenized records, stopping at the first error.
    fn collect(&self, rows: RecordIter<'_>, filter: Option<&ImportFilter>) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for (record_index, row) in rows.enumerate() {
            let record = row?;
            match filter {
                Some(filter) => {
                    if let Some(kept) = filter.apply(record, &FilterContext { record_index })? {
                        records.push(kept);
                    }
                }
                None => records.push(record),
            }
        }
        Ok(records)
    }

    /// Type inference and field-name cleanup.
    fn finish(&self, table: DataTable, options: &ImportOptions) -> DataTable {
        let hints = options.field_type_hints(self.sink.as_ref());
        let outcome = TypeInferencer::new(hints).infer(table);
        for field in &outcome.auto_detected {
            log_field!(self.config.log, field = %field, "Field detected as numeric");
        }
        if !outcome.auto_detected.is_empty() {
            self.sink.report(Diagnostic::AutoDetectedNumberFields {
                fields: outcome.auto_detected,
            });
        }

        let mut table = outcome.table;
        let removed = table.delete_fields(is_invalid_field_name);
        if !removed.is_empty() {
            debug!(count = removed.len(), "Removed fields with blank names");
        }
        table
    }
}

impl fmt::Debug for Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Imports inline delimited text with default settings.
pub fn import_delim(text: &str, options: &ImportOptions) -> Result<Dataset> {
    Importer::new().import(Source::text(text), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimiter::Delimiter;
    use crate::diagnostics::CollectingSink;
    use crate::error::ImportError;
    use crate::table::Value;

    fn importer_with_sink() -> (Importer, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let importer = Importer::new().with_sink(sink.clone());
        (importer, sink)
    }

    #[test]
    fn test_basic_import() {
        let (importer, sink) = importer_with_sink();
        let ds = importer
            .import(
                Source::text("name,pop,fips\nEly,\"4,255\",32033\nBaker,68,NA\n"),
                &ImportOptions::new().with_string_fields(["fips"]),
            )
            .unwrap();

        let table = ds.table();
        assert_eq!(ds.info.input_delimiter, Delimiter::Comma);
        assert_eq!(table.field_names(), ["name", "pop", "fips"]);
        assert_eq!(table.records()[0]["pop"], Value::Number(4255.0));
        assert_eq!(table.records()[1]["fips"], Value::from("NA"));
        assert_eq!(
            sink.diagnostics(),
            vec![Diagnostic::AutoDetectedNumberFields {
                fields: vec!["pop".to_string()]
            }]
        );
    }

    #[test]
    fn test_empty_result_is_warning() {
        let (importer, sink) = importer_with_sink();
        let ds = importer
            .import(Source::text("a;b\n"), &ImportOptions::new())
            .unwrap();
        assert!(ds.table().is_empty());
        assert_eq!(ds.info.input_delimiter, Delimiter::Semicolon);
        assert!(sink.contains(&Diagnostic::EmptyResult));
    }

    #[test]
    fn test_filter_drops_records_and_uses_index() {
        let opts = ImportOptions::new().with_csv_filter("$index > 0 && pop < 100");
        let ds = import_delim("name\tpop\nA\t5\nB\t50\nC\t500", &opts).unwrap();
        let names: Vec<_> = ds.table().column("name").into_iter().flatten().cloned().collect();
        assert_eq!(names, vec![Value::from("B")]);
    }

    #[test]
    fn test_filter_error_aborts() {
        let err = import_delim("a,b\n1,2", &ImportOptions::new().with_csv_filter("a + b")).unwrap_err();
        assert!(matches!(err, ImportError::FilterExpression { .. }));

        let err = import_delim("a,b\n1,2", &ImportOptions::new().with_csv_filter("a")).unwrap_err();
        assert!(err.to_string().contains("must return true or false"));
    }

    #[test]
    fn test_projection_and_rename() {
        let opts = ImportOptions::new().with_csv_fields(["id=fips", "name"]);
        let ds = import_delim("name,fips,pop\nEly,32033,4255", &opts).unwrap();
        assert_eq!(ds.table().field_names(), ["id", "name"]);
        assert_eq!(ds.table().records()[0]["id"], Value::Number(32033.0));
    }

    #[test]
    fn test_blank_field_names_are_removed() {
        let ds = import_delim("name,, \nEly,x,y", &ImportOptions::new()).unwrap();
        assert_eq!(ds.table().field_names(), ["name"]);
        assert_eq!(ds.table().records()[0].len(), 1);
    }

    #[test]
    fn test_invalid_type_hint_is_reported() {
        let (importer, sink) = importer_with_sink();
        importer
            .import(
                Source::text("a\n1"),
                &ImportOptions::new().with_field_types(["a:date"]),
            )
            .unwrap();
        assert!(sink.contains(&Diagnostic::InvalidTypeHint {
            raw: "a:date".to_string()
        }));
    }

    #[test]
    fn test_unknown_encoding() {
        let err = import_delim("a\n1", &ImportOptions::new().with_encoding("klingon")).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedEncoding(_)));
    }

    #[test]
    fn test_buffer_is_streamed_with_same_result() {
        let text = "id|label|score\n1|x,y|3.5\n2||7\n3|z|\n";
        let buffered = import_delim(text, &ImportOptions::new()).unwrap();
        let streamed = Importer::new()
            .import(Source::bytes(text.as_bytes().to_vec()), &ImportOptions::new())
            .unwrap();
        assert_eq!(buffered, streamed);
    }
}
