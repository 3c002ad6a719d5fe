//! Import options and engine configuration.
//!
//! [`ImportOptions`] are the user-facing knobs (encoding, filter, field
//! selection, type hints). [`ImportConfig`] tunes the engine itself and is
//! normally left at its defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::Result;
use crate::logging::LogConfig;

/// Files at least this large are read incrementally.
pub const DEFAULT_STREAMING_THRESHOLD: u64 = 2_000_000_000;

/// Bytes inspected when sniffing the delimiter of an incremental source.
pub const DEFAULT_SNIFF_PREFIX_LEN: usize = 2000;

/// Field name that applies a hint to every field.
pub const WILDCARD_FIELD: &str = "*";

/// User options recognized by the importer.
///
/// Unknown keys are ignored when deserializing, so option bags shared with
/// other commands (e.g. `precision`) can be passed through untouched.
///
/// # Examples
///
/// ```rust
/// use dsv_import::options::ImportOptions;
///
/// let opts = ImportOptions::new()
///     .with_encoding("latin1")
///     .with_string_fields(["fips"])
///     .with_field_types(["pop:num", "+area"]);
/// assert_eq!(opts.encoding.as_deref(), Some("latin1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Text encoding label (WHATWG names, e.g. `utf-8`, `latin1`, `utf-16le`)
    pub encoding: Option<String>,
    /// Expression evaluated per record; records yielding `false` are dropped
    pub csv_filter: Option<String>,
    /// Fields to keep, as `name` or `dest=src`
    pub csv_fields: Option<Vec<String>>,
    /// Fields forced to string type
    pub string_fields: Option<Vec<String>>,
    /// Type hints as `name:type` or `+name`
    pub field_types: Option<Vec<String>>,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_csv_filter(mut self, expression: impl Into<String>) -> Self {
        self.csv_filter = Some(expression.into());
        self
    }

    pub fn with_csv_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.csv_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_string_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.string_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_field_types<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_types = Some(hints.into_iter().map(Into::into).collect());
        self
    }

    /// Collects the effective per-field type hints.
    ///
    /// `string_fields` are applied first, then `field_types`, so a later
    /// `field_types` entry overrides a `string_fields` entry for the same
    /// name. Unrecognized tokens are reported and skipped.
    pub fn field_type_hints(&self, sink: &dyn DiagnosticSink) -> FieldTypeHints {
        let mut hints = FieldTypeHints::default();
        for name in self.string_fields.iter().flatten() {
            hints.insert(name.clone(), FieldType::String);
        }
        for raw in self.field_types.iter().flatten() {
            match parse_type_hint(raw) {
                Some((name, ty)) => hints.insert(name, ty),
                None => sink.report(Diagnostic::InvalidTypeHint { raw: raw.clone() }),
            }
        }
        hints
    }
}

/// A coerced field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
}

impl FieldType {
    /// Accepts a type suffix such as `num`, `number`, `str` or `string`.
    ///
    /// Only the first letter matters: `n...` is a number, `s...` a string.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('n') => Some(FieldType::Number),
            Some('s') => Some(FieldType::String),
            _ => None,
        }
    }
}

/// Parses one `field_types` token.
///
/// `name:type` uses the text up to the first colon as the name and the text
/// between the first and second colon as the type. `+name` is the unary-plus
/// shorthand for a number field.
pub fn parse_type_hint(raw: &str) -> Option<(String, FieldType)> {
    if raw.contains(':') {
        let mut parts = raw.split(':');
        let name = parts.next().unwrap_or_default();
        let ty = FieldType::from_hint(parts.next().unwrap_or_default())?;
        Some((name.to_string(), ty))
    } else {
        raw.strip_prefix('+')
            .map(|name| (name.to_string(), FieldType::Number))
    }
}

/// Field name (or `*`) to forced type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTypeHints {
    hints: HashMap<String, FieldType>,
}

impl FieldTypeHints {
    pub fn insert(&mut self, name: impl Into<String>, ty: FieldType) {
        self.hints.insert(name.into(), ty);
    }

    /// The hint for `field`: an explicit entry wins over the wildcard.
    pub fn resolve(&self, field: &str) -> Option<FieldType> {
        self.hints
            .get(field)
            .or_else(|| self.hints.get(WILDCARD_FIELD))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, FieldType)> for FieldTypeHints {
    fn from_iter<I: IntoIterator<Item = (S, FieldType)>>(iter: I) -> Self {
        let mut hints = Self::default();
        for (name, ty) in iter {
            hints.insert(name, ty);
        }
        hints
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Files of at least this many bytes are read incrementally
    pub streaming_threshold: u64,
    /// Number of leading bytes sniffed on incremental sources
    pub sniff_prefix_len: usize,
    /// Logging behaviour
    pub log: LogConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            streaming_threshold: DEFAULT_STREAMING_THRESHOLD,
            sniff_prefix_len: DEFAULT_SNIFF_PREFIX_LEN,
            log: LogConfig::default(),
        }
    }
}

impl ImportConfig {
    /// Always reads files incrementally, whatever their size.
    pub fn streaming() -> Self {
        Self {
            streaming_threshold: 0,
            ..Self::default()
        }
    }

    /// Quiet configuration for embedding in larger tools.
    pub fn production() -> Self {
        Self {
            log: LogConfig::production(),
            ..Self::default()
        }
    }

    pub fn with_streaming_threshold(mut self, bytes: u64) -> Self {
        self.streaming_threshold = bytes;
        self
    }

    pub fn with_sniff_prefix_len(mut self, len: usize) -> Self {
        self.sniff_prefix_len = len;
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}
