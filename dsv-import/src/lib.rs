//! # dsv-import - Delimited Text Import for Rust
//!
//! `dsv-import` turns comma, tab, pipe or semicolon separated text into an
//! owned, typed table. It sniffs the delimiter, tokenizes the rows, applies
//! an optional record filter and field projection, infers numeric columns
//! and cleans up field names.
//!
//! ## Quick Start
//!
//! ```rust
//! use dsv_import::prelude::*;
//!
//! # fn main() -> dsv_import::error::Result<()> {
//! let options = ImportOptions::new()
//!     .with_csv_filter("pop > 100")
//!     .with_string_fields(["fips"]);
//!
//! let dataset = Importer::new().import(
//!     Source::text("name\tfips\tpop\nEly\t32033\t4255\nBaker\t32017\t68\n"),
//!     &options,
//! )?;
//!
//! let table = dataset.table();
//! assert_eq!(dataset.info.input_delimiter, Delimiter::Tab);
//! assert_eq!(table.len(), 1);
//! assert_eq!(table.records()[0]["fips"], Value::from("32033"));
//! assert_eq!(table.records()[0]["pop"], Value::Number(4255.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! 1. **Source classification** ([`sources`]): inline text and small files
//!    are parsed from a decoded string; byte buffers and files above the
//!    streaming threshold are tokenized incrementally. Encodings that are
//!    not ASCII compatible always fall back to full decoding.
//! 2. **Delimiter sniffing** ([`delimiter`]): pipe, tab, comma and semicolon
//!    are tried in that order against the first line; comma is the default.
//! 3. **Tokenizing** ([`tokenizer`]): the first row is the header.
//! 4. **Filtering** ([`filter`]): `csv_filter` drops records, `csv_fields`
//!    selects and renames fields.
//! 5. **Type inference** ([`inference`]): hinted fields are coerced, other
//!    fields become numeric when every non-missing value is a number.
//! 6. **Cleanup** ([`sanitize`]): fields with blank names are removed.
//!
//! Non-fatal conditions such as an empty result are reported through a
//! [`DiagnosticSink`](diagnostics::DiagnosticSink); fatal ones abort the import
//! with an [`ImportError`](error::ImportError).
//!
//! ## Logging
//!
//! The crate emits `tracing` events and never installs a subscriber itself.
//! Binaries can call [`logging::setup::init_logging`].

pub mod delimiter;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod formatters;
pub mod importer;
pub mod inference;
pub mod logging;
pub mod options;
pub mod prelude;
pub mod sanitize;
pub mod sources;
pub mod table;
pub mod tokenizer;
