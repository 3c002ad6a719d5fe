//! Prelude for commonly used types and traits in dsv-import.

pub use crate::delimiter::Delimiter;
pub use crate::diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
pub use crate::error::{ErrorContext, ImportError, Result};
pub use crate::filter::{ExpressionCompiler, RecordFilterCompiler};
pub use crate::formatters::{DatasetFormatter, FormatterConfig};
pub use crate::importer::{import_delim, Importer};
pub use crate::logging::LogConfig;
pub use crate::options::{FieldType, ImportConfig, ImportOptions};
pub use crate::sources::Source;
pub use crate::table::{DataTable, Dataset, Record, Value};
pub use crate::tokenizer::{CsvTokenizer, RecordTokenizer};
